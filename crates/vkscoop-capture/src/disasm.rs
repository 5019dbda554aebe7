//! The SPIR-V disassembly seam.
//!
//! Amber wants SPIRV-ASM text; producing it properly is a job for an
//! external disassembler. The tracker only depends on this trait, keyed by
//! the version word embedded in the binary. The built-in implementation
//! validates the blob and renders a deterministic word listing, which keeps
//! the capture pipeline self-contained.

use vkscoop_core::{spirv, ScoopError};

pub trait SpirvDisassembler: Send + Sync {
    fn disassemble(&self, code: &[u32]) -> Result<String, ScoopError>;
}

/// Header validation plus a hex word dump.
#[derive(Default)]
pub struct WordListDisassembler;

impl SpirvDisassembler for WordListDisassembler {
    fn disassemble(&self, code: &[u32]) -> Result<String, ScoopError> {
        if code.len() < 2 {
            return Err(ScoopError::Disassembly(format!(
                "binary of {} words has no header",
                code.len()
            )));
        }
        if code[0] != spirv::SPIRV_MAGIC {
            return Err(ScoopError::Disassembly(format!(
                "bad magic 0x{:08x}",
                code[0]
            )));
        }

        let version = code[1];
        let mut out = format!(
            "; SPIR-V\n; Version: {}.{}\n; Words: {}\n",
            spirv::version_major(version),
            spirv::version_minor(version),
            code.len()
        );
        for line in code.chunks(8) {
            let words: Vec<String> = line.iter().map(|w| format!("0x{w:08x}")).collect();
            out.push_str("; ");
            out.push_str(&words.join(" "));
            out.push('\n');
        }
        Ok(out)
    }
}
