//! Draw-call reconstruction.
//!
//! At queue submit, every shadow that contains draw calls is replayed
//! through a [`DrawCallTracker`]: commands fold into a [`DrawCallState`]
//! and each draw command either falls outside the capture window (the one
//! non-fatal skip in the whole pipeline) or is emitted as an Amber scene
//! file plus raw buffer side-cars.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use ash::vk;

use vkscoop_core::{CaptureSettings, ScoopError};

use crate::amber::{topology_name, AmberScene, RunCommand};
use crate::buffer_file::BufferFileWriter;
use crate::command::Command;
use crate::deep_copy::{BarrierSnapshot, RenderPassBeginSnapshot};
use crate::disasm::SpirvDisassembler;
use crate::formats::AmberFormat;
use crate::tables::{DeviceTables, GraphicsPipelineState};

/// Synchronous GPU buffer read-back. This is the only blocking operation
/// in the capture path; the layer implements it with a staging copy over
/// next-layer functions, tests implement it with canned bytes.
pub trait BufferReadback {
    fn read_buffer(
        &self,
        queue: vk::Queue,
        buffer: vk::Buffer,
        size: vk::DeviceSize,
    ) -> Result<Vec<u8>, ScoopError>;
}

/// Everything a replay needs: the process-wide window settings and draw
/// counter, the device's state tables, and the two collaborator seams.
#[derive(Clone, Copy)]
pub struct CaptureContext<'a> {
    pub settings: &'a CaptureSettings,
    pub draw_counter: &'a AtomicU64,
    pub tables: &'a DeviceTables,
    pub readback: &'a dyn BufferReadback,
    pub disassembler: &'a dyn SpirvDisassembler,
}

#[derive(Clone, Copy)]
struct VertexBufferBinding {
    buffer: vk::Buffer,
    offset: vk::DeviceSize,
}

#[derive(Clone, Copy)]
struct IndexBufferBinding {
    buffer: vk::Buffer,
    offset: vk::DeviceSize,
    index_type: vk::IndexType,
}

/// State accumulated while folding a shadow's commands, reset per replay.
#[derive(Default)]
struct DrawCallState<'a> {
    render_pass: Option<&'a RenderPassBeginSnapshot>,
    subpass: u32,
    graphics_pipeline: Option<vk::Pipeline>,
    index_buffer: Option<IndexBufferBinding>,
    vertex_buffers: HashMap<u32, VertexBufferBinding>,
    push_constants: Vec<u8>,
    barriers: Vec<&'a BarrierSnapshot>,
}

enum DrawParams {
    Arrays {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    Indexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    },
}

pub struct DrawCallTracker<'a> {
    ctx: CaptureContext<'a>,
    queue: vk::Queue,
    state: DrawCallState<'a>,
}

impl<'a> DrawCallTracker<'a> {
    pub fn new(ctx: CaptureContext<'a>, queue: vk::Queue) -> Self {
        Self {
            ctx,
            queue,
            state: DrawCallState::default(),
        }
    }

    /// Fold a shadow's commands in recording order, capturing every draw
    /// that lands in the window.
    pub fn replay(&mut self, commands: &'a [Command]) -> Result<(), ScoopError> {
        self.state = DrawCallState::default();
        for command in commands {
            self.process(command)?;
        }
        Ok(())
    }

    fn process(&mut self, command: &'a Command) -> Result<(), ScoopError> {
        match command {
            Command::BeginRenderPass { begin, .. } => {
                self.state.render_pass = Some(begin);
                self.state.subpass = 0;
            }
            Command::BindPipeline {
                bind_point,
                pipeline,
            } => {
                // Compute binds share the entry point but never feed a draw.
                if *bind_point == vk::PipelineBindPoint::GRAPHICS {
                    self.state.graphics_pipeline = Some(*pipeline);
                }
            }
            Command::BindIndexBuffer {
                buffer,
                offset,
                index_type,
            } => {
                self.state.index_buffer = Some(IndexBufferBinding {
                    buffer: *buffer,
                    offset: *offset,
                    index_type: *index_type,
                });
            }
            Command::BindVertexBuffers {
                first_binding,
                buffers,
                offsets,
            } => {
                for (i, (buffer, offset)) in buffers.iter().zip(offsets.iter()).enumerate() {
                    self.state.vertex_buffers.insert(
                        first_binding + i as u32,
                        VertexBufferBinding {
                            buffer: *buffer,
                            offset: *offset,
                        },
                    );
                }
            }
            Command::PipelineBarrier(barrier) => {
                self.state.barriers.push(barrier);
            }
            Command::Draw {
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            } => {
                self.capture_draw(DrawParams::Arrays {
                    vertex_count: *vertex_count,
                    instance_count: *instance_count,
                    first_vertex: *first_vertex,
                    first_instance: *first_instance,
                })?;
            }
            Command::DrawIndexed {
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            } => {
                self.capture_draw(DrawParams::Indexed {
                    index_count: *index_count,
                    instance_count: *instance_count,
                    first_index: *first_index,
                    vertex_offset: *vertex_offset,
                    first_instance: *first_instance,
                })?;
            }
        }
        Ok(())
    }

    fn capture_draw(&mut self, draw: DrawParams) -> Result<(), ScoopError> {
        // Every draw takes exactly one ordinal, filtered or not, so the
        // numbering is stable no matter where the window sits.
        let ordinal = self.ctx.draw_counter.fetch_add(1, Ordering::SeqCst);
        if !self.ctx.settings.in_window(ordinal) {
            return Ok(());
        }

        tracing::debug!(
            ordinal,
            barriers = self.state.barriers.len(),
            push_constant_bytes = self.state.push_constants.len(),
            "capturing draw call"
        );

        if self.state.render_pass.is_none() {
            tracing::error!(ordinal, "draw call recorded outside a render pass");
            panic!("draw call {ordinal} recorded outside a render pass");
        }
        let pipeline = match self.state.graphics_pipeline {
            Some(pipeline) => pipeline,
            None => {
                tracing::error!(ordinal, "draw call with no bound graphics pipeline");
                panic!("draw call {ordinal} with no bound graphics pipeline");
            }
        };
        let pipeline_state = match self.ctx.tables.graphics_pipelines.get(&pipeline) {
            Some(state) => state,
            None => {
                tracing::error!(ordinal, "no create info tracked for the bound pipeline");
                panic!("draw call {ordinal}: no create info tracked for the bound pipeline");
            }
        };

        let (vertex_code, fragment_code) = self.shader_stage_code(ordinal, &pipeline_state);
        // Disassemble before creating any file, so a failed capture leaves
        // nothing half-written behind.
        let vertex_shader = self.ctx.disassembler.disassemble(&vertex_code)?;
        let fragment_shader = self.ctx.disassembler.disassemble(&fragment_code)?;

        let run = match draw {
            DrawParams::Arrays {
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            } => RunCommand::Arrays {
                first_vertex,
                vertex_count,
                first_instance,
                instance_count,
            },
            DrawParams::Indexed {
                index_count,
                instance_count,
                first_index,
                first_instance,
                ..
            } => RunCommand::Indexed {
                first_index,
                index_count,
                first_instance,
                instance_count,
            },
        };

        let scene = AmberScene {
            vertex_shader,
            fragment_shader,
            topology: topology_name(pipeline_state.create_info.topology),
            run,
        };
        let text = scene.render();

        let prefix = &self.ctx.settings.output_file_prefix;
        let path = format!("{prefix}_{ordinal}.amber");
        std::fs::write(&path, text)?;
        tracing::info!(ordinal, %path, "wrote amber scene");

        self.write_side_cars(ordinal, &pipeline_state, &draw)?;
        Ok(())
    }

    /// Locate exactly one vertex and one fragment stage and return their
    /// module code. Any other stage kind, a duplicate, or a missing stage
    /// makes the draw unreconstructable.
    fn shader_stage_code(
        &self,
        ordinal: u64,
        pipeline_state: &GraphicsPipelineState,
    ) -> (Vec<u32>, Vec<u32>) {
        let mut vertex = None;
        let mut fragment = None;
        for stage in &pipeline_state.create_info.stages {
            if stage.stage == vk::ShaderStageFlags::VERTEX {
                if vertex.replace(stage).is_some() {
                    panic!("draw call {ordinal}: pipeline with two vertex stages");
                }
            } else if stage.stage == vk::ShaderStageFlags::FRAGMENT {
                if fragment.replace(stage).is_some() {
                    panic!("draw call {ordinal}: pipeline with two fragment stages");
                }
            } else {
                tracing::error!(ordinal, stage = ?stage.stage, "unsupported shader stage");
                panic!(
                    "draw call {ordinal}: unsupported shader stage {:?}",
                    stage.stage
                );
            }
        }
        let vertex = match vertex {
            Some(stage) => stage,
            None => panic!("draw call {ordinal}: pipeline without a vertex stage"),
        };
        let fragment = match fragment {
            Some(stage) => stage,
            None => panic!("draw call {ordinal}: pipeline without a fragment stage"),
        };

        let code_of = |module: vk::ShaderModule| -> Vec<u32> {
            match pipeline_state.shader_module(module) {
                Some(state) => state.code().to_vec(),
                None => {
                    panic!("draw call {ordinal}: pipeline references an untracked shader module")
                }
            }
        };
        (code_of(vertex.module), code_of(fragment.module))
    }

    /// Read back the draw's source buffers and write raw side-cars:
    /// one padded stream per vertex attribute, plus the used index range
    /// for indexed draws.
    fn write_side_cars(
        &self,
        ordinal: u64,
        pipeline_state: &GraphicsPipelineState,
        draw: &DrawParams,
    ) -> Result<(), ScoopError> {
        let prefix = &self.ctx.settings.output_file_prefix;

        // For indexed draws the vertex span comes from the index data.
        let (vertex_base, vertex_count) = match *draw {
            DrawParams::Arrays {
                first_vertex,
                vertex_count,
                ..
            } => (i64::from(first_vertex), vertex_count),
            DrawParams::Indexed {
                first_index,
                index_count,
                vertex_offset,
                ..
            } => {
                let max_index =
                    self.write_index_side_car(ordinal, prefix, first_index, index_count)?;
                (i64::from(vertex_offset), max_index + 1)
            }
        };

        let vertex_input = &pipeline_state.create_info.vertex_input;
        if vertex_input.attributes.is_empty() {
            return Ok(());
        }

        let mut read_cache: HashMap<vk::Buffer, Vec<u8>> = HashMap::new();
        for attribute in &vertex_input.attributes {
            let binding_desc = match vertex_input
                .bindings
                .iter()
                .find(|b| b.binding == attribute.binding)
            {
                Some(desc) => desc,
                None => {
                    panic!(
                        "draw call {ordinal}: attribute location {} names undeclared binding {}",
                        attribute.location, attribute.binding
                    )
                }
            };
            let bound = match self.state.vertex_buffers.get(&attribute.binding) {
                Some(bound) => *bound,
                None => {
                    tracing::error!(
                        ordinal,
                        binding = attribute.binding,
                        "no vertex buffer bound for pipeline binding"
                    );
                    panic!(
                        "draw call {ordinal}: no vertex buffer bound for binding {}",
                        attribute.binding
                    );
                }
            };
            if !read_cache.contains_key(&bound.buffer) {
                let create = match self.ctx.tables.buffers.get(&bound.buffer) {
                    Some(create) => create,
                    None => {
                        panic!("draw call {ordinal}: vertex buffer has no tracked create info")
                    }
                };
                let data = self
                    .ctx
                    .readback
                    .read_buffer(self.queue, bound.buffer, create.size)?;
                read_cache.insert(bound.buffer, data);
            }
            let data = &read_cache[&bound.buffer];

            let format = AmberFormat::new(attribute.format);
            let mut writer =
                BufferFileWriter::create(format!("{prefix}_{ordinal}_attr{}.bin", attribute.location))?;
            for i in 0..vertex_count {
                let vertex_index = vertex_base + i64::from(i);
                if vertex_index < 0 {
                    panic!("draw call {ordinal}: negative vertex index {vertex_index}");
                }
                let element_offset = bound.offset
                    + vertex_index as u64 * u64::from(binding_desc.stride)
                    + u64::from(attribute.offset);
                writer.write_element(data, element_offset as usize, &format)?;
            }
            writer.finish()?;
        }
        Ok(())
    }

    /// Write the used index range verbatim and return the largest index in
    /// it.
    fn write_index_side_car(
        &self,
        ordinal: u64,
        prefix: &str,
        first_index: u32,
        index_count: u32,
    ) -> Result<u32, ScoopError> {
        let binding = match self.state.index_buffer {
            Some(binding) => binding,
            None => {
                tracing::error!(ordinal, "indexed draw with no bound index buffer");
                panic!("draw call {ordinal}: indexed draw with no bound index buffer");
            }
        };
        let create = match self.ctx.tables.buffers.get(&binding.buffer) {
            Some(create) => create,
            None => panic!("draw call {ordinal}: index buffer has no tracked create info"),
        };
        let data = self
            .ctx
            .readback
            .read_buffer(self.queue, binding.buffer, create.size)?;

        let element_size = match binding.index_type {
            vk::IndexType::UINT16 => 2usize,
            vk::IndexType::UINT32 => 4usize,
            other => {
                tracing::error!(ordinal, index_type = ?other, "unsupported index type");
                panic!("draw call {ordinal}: unsupported index type {other:?}");
            }
        };
        let start = binding.offset as usize + first_index as usize * element_size;
        let end = start + index_count as usize * element_size;
        if end > data.len() {
            tracing::error!(ordinal, start, end, len = data.len(), "index range outside buffer");
            panic!("draw call {ordinal}: index range [{start}, {end}) outside buffer of {} bytes", data.len());
        }
        let index_bytes = &data[start..end];

        let mut writer = BufferFileWriter::create(format!("{prefix}_{ordinal}_indices.bin"))?;
        writer.write_raw(index_bytes)?;
        writer.finish()?;

        let max_index = match binding.index_type {
            vk::IndexType::UINT16 => index_bytes
                .chunks_exact(2)
                .map(|c| u32::from(u16::from_le_bytes([c[0], c[1]])))
                .max(),
            _ => index_bytes
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .max(),
        };
        match max_index {
            Some(max) => Ok(max),
            None => panic!("draw call {ordinal}: indexed draw with zero indices"),
        }
    }
}
