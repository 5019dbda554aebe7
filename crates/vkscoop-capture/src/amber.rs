//! Rendering captured draws as Amber scene scripts.

use std::fmt::Write;

use ash::vk;

/// Amber's name for a primitive topology.
pub fn topology_name(topology: vk::PrimitiveTopology) -> &'static str {
    match topology {
        vk::PrimitiveTopology::POINT_LIST => "POINT_LIST",
        vk::PrimitiveTopology::LINE_LIST => "LINE_LIST",
        vk::PrimitiveTopology::LINE_STRIP => "LINE_STRIP",
        vk::PrimitiveTopology::TRIANGLE_LIST => "TRIANGLE_LIST",
        vk::PrimitiveTopology::TRIANGLE_STRIP => "TRIANGLE_STRIP",
        vk::PrimitiveTopology::TRIANGLE_FAN => "TRIANGLE_FAN",
        vk::PrimitiveTopology::LINE_LIST_WITH_ADJACENCY => "LINE_LIST_WITH_ADJACENCY",
        vk::PrimitiveTopology::LINE_STRIP_WITH_ADJACENCY => "LINE_STRIP_WITH_ADJACENCY",
        vk::PrimitiveTopology::TRIANGLE_LIST_WITH_ADJACENCY => "TRIANGLE_LIST_WITH_ADJACENCY",
        vk::PrimitiveTopology::TRIANGLE_STRIP_WITH_ADJACENCY => "TRIANGLE_STRIP_WITH_ADJACENCY",
        vk::PrimitiveTopology::PATCH_LIST => "PATCH_LIST",
        other => {
            tracing::error!(topology = ?other, "topology not supported by amber");
            panic!("topology not supported by amber: {other:?}");
        }
    }
}

/// The draw parameters of the RUN command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunCommand {
    Arrays {
        first_vertex: u32,
        vertex_count: u32,
        first_instance: u32,
        instance_count: u32,
    },
    Indexed {
        first_index: u32,
        index_count: u32,
        first_instance: u32,
        instance_count: u32,
    },
}

/// One captured draw, ready to render as a scene script.
pub struct AmberScene {
    pub vertex_shader: String,
    pub fragment_shader: String,
    pub topology: &'static str,
    pub run: RunCommand,
}

impl AmberScene {
    /// The RUN line. The instance clause appears only for explicitly
    /// instanced draws (instance count above one); a plain single-instance
    /// draw renders the minimal form.
    pub fn run_line(&self) -> String {
        let mut line = format!("RUN pipeline DRAW_ARRAY AS {}", self.topology);
        match self.run {
            RunCommand::Arrays {
                first_vertex,
                vertex_count,
                first_instance,
                instance_count,
            } => {
                let _ = write!(line, " START_IDX {first_vertex} COUNT {vertex_count}");
                if instance_count > 1 {
                    let _ = write!(
                        line,
                        " START_INSTANCE {first_instance} INSTANCE_COUNT {instance_count}"
                    );
                }
            }
            RunCommand::Indexed {
                first_index,
                index_count,
                first_instance,
                instance_count,
            } => {
                let _ = write!(line, " INDEXED START_IDX {first_index} COUNT {index_count}");
                if instance_count > 1 {
                    let _ = write!(
                        line,
                        " START_INSTANCE {first_instance} INSTANCE_COUNT {instance_count}"
                    );
                }
            }
        }
        line
    }

    /// Render the whole scene script.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("#!amber\n\n");

        out.push_str("SHADER vertex vertex_shader SPIRV-ASM\n");
        out.push_str(self.vertex_shader.trim_end());
        out.push_str("\nEND\n\n");

        out.push_str("SHADER fragment fragment_shader SPIRV-ASM\n");
        out.push_str(self.fragment_shader.trim_end());
        out.push_str("\nEND\n\n");

        out.push_str("PIPELINE graphics pipeline\n");
        out.push_str("  ATTACH vertex_shader\n");
        out.push_str("  ATTACH fragment_shader\n");
        out.push_str("END\n\n");

        out.push_str(&self.run_line());
        out.push('\n');
        out
    }
}
