//! The recorded command model.
//!
//! One tagged enum covers every intercepted `vkCmd*`. The set is closed:
//! the reconstructor matches exhaustively, so adding a kind forces every
//! consumer to handle it.

use ash::vk;

use crate::deep_copy::{BarrierSnapshot, RenderPassBeginSnapshot};

pub enum Command {
    BeginRenderPass {
        begin: RenderPassBeginSnapshot,
        contents: vk::SubpassContents,
    },
    BindPipeline {
        bind_point: vk::PipelineBindPoint,
        pipeline: vk::Pipeline,
    },
    BindIndexBuffer {
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        index_type: vk::IndexType,
    },
    BindVertexBuffers {
        first_binding: u32,
        buffers: Vec<vk::Buffer>,
        offsets: Vec<vk::DeviceSize>,
    },
    PipelineBarrier(BarrierSnapshot),
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    },
}

impl Command {
    pub fn is_draw_call(&self) -> bool {
        matches!(self, Command::Draw { .. } | Command::DrawIndexed { .. })
    }
}
