//! Command-buffer recording interception and the queue-submit replay.
//!
//! Every `vkCmd*` chains through to the next layer first, then appends an
//! owning snapshot to the command buffer's shadow. Replay runs at
//! `vkQueueSubmit` before the submit chains down, so buffer read-back sees
//! the contents the draws were recorded against.

use ash::vk;
use ash::vk::Handle;
use tracing::error;

use vkscoop_capture::deep_copy::{copy_array, BarrierSnapshot, RenderPassBeginSnapshot};
use vkscoop_capture::disasm::WordListDisassembler;
use vkscoop_capture::{CaptureContext, Command, DrawCallTracker};

use crate::buffer_copy::StagingReadback;
use crate::device::device_data;
use crate::global::global;

pub(crate) unsafe extern "system" fn cmd_begin_render_pass(
    command_buffer: vk::CommandBuffer,
    p_render_pass_begin: *const vk::RenderPassBeginInfo<'_>,
    contents: vk::SubpassContents,
) {
    let data = device_data(command_buffer.as_raw());
    (data.next.cmd_begin_render_pass)(command_buffer, p_render_pass_begin, contents);
    data.tables.command_buffers.record(
        command_buffer,
        Command::BeginRenderPass {
            begin: RenderPassBeginSnapshot::capture(&*p_render_pass_begin),
            contents,
        },
    );
}

pub(crate) unsafe extern "system" fn cmd_bind_pipeline(
    command_buffer: vk::CommandBuffer,
    pipeline_bind_point: vk::PipelineBindPoint,
    pipeline: vk::Pipeline,
) {
    let data = device_data(command_buffer.as_raw());
    (data.next.cmd_bind_pipeline)(command_buffer, pipeline_bind_point, pipeline);
    data.tables.command_buffers.record(
        command_buffer,
        Command::BindPipeline {
            bind_point: pipeline_bind_point,
            pipeline,
        },
    );
}

pub(crate) unsafe extern "system" fn cmd_bind_index_buffer(
    command_buffer: vk::CommandBuffer,
    buffer: vk::Buffer,
    offset: vk::DeviceSize,
    index_type: vk::IndexType,
) {
    let data = device_data(command_buffer.as_raw());
    (data.next.cmd_bind_index_buffer)(command_buffer, buffer, offset, index_type);
    data.tables.command_buffers.record(
        command_buffer,
        Command::BindIndexBuffer {
            buffer,
            offset,
            index_type,
        },
    );
}

pub(crate) unsafe extern "system" fn cmd_bind_vertex_buffers(
    command_buffer: vk::CommandBuffer,
    first_binding: u32,
    binding_count: u32,
    p_buffers: *const vk::Buffer,
    p_offsets: *const vk::DeviceSize,
) {
    let data = device_data(command_buffer.as_raw());
    (data.next.cmd_bind_vertex_buffers)(
        command_buffer,
        first_binding,
        binding_count,
        p_buffers,
        p_offsets,
    );
    data.tables.command_buffers.record(
        command_buffer,
        Command::BindVertexBuffers {
            first_binding,
            buffers: copy_array(p_buffers, binding_count as usize, 0),
            offsets: copy_array(p_offsets, binding_count as usize, 0),
        },
    );
}

pub(crate) unsafe extern "system" fn cmd_pipeline_barrier(
    command_buffer: vk::CommandBuffer,
    src_stage_mask: vk::PipelineStageFlags,
    dst_stage_mask: vk::PipelineStageFlags,
    dependency_flags: vk::DependencyFlags,
    memory_barrier_count: u32,
    p_memory_barriers: *const vk::MemoryBarrier<'_>,
    buffer_memory_barrier_count: u32,
    p_buffer_memory_barriers: *const vk::BufferMemoryBarrier<'_>,
    image_memory_barrier_count: u32,
    p_image_memory_barriers: *const vk::ImageMemoryBarrier<'_>,
) {
    let data = device_data(command_buffer.as_raw());
    (data.next.cmd_pipeline_barrier)(
        command_buffer,
        src_stage_mask,
        dst_stage_mask,
        dependency_flags,
        memory_barrier_count,
        p_memory_barriers,
        buffer_memory_barrier_count,
        p_buffer_memory_barriers,
        image_memory_barrier_count,
        p_image_memory_barriers,
    );
    data.tables.command_buffers.record(
        command_buffer,
        Command::PipelineBarrier(BarrierSnapshot::capture(
            src_stage_mask,
            dst_stage_mask,
            dependency_flags,
            memory_barrier_count,
            p_memory_barriers,
            buffer_memory_barrier_count,
            p_buffer_memory_barriers,
            image_memory_barrier_count,
            p_image_memory_barriers,
        )),
    );
}

pub(crate) unsafe extern "system" fn cmd_draw(
    command_buffer: vk::CommandBuffer,
    vertex_count: u32,
    instance_count: u32,
    first_vertex: u32,
    first_instance: u32,
) {
    let data = device_data(command_buffer.as_raw());
    (data.next.cmd_draw)(
        command_buffer,
        vertex_count,
        instance_count,
        first_vertex,
        first_instance,
    );
    data.tables.command_buffers.record(
        command_buffer,
        Command::Draw {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        },
    );
}

pub(crate) unsafe extern "system" fn cmd_draw_indexed(
    command_buffer: vk::CommandBuffer,
    index_count: u32,
    instance_count: u32,
    first_index: u32,
    vertex_offset: i32,
    first_instance: u32,
) {
    let data = device_data(command_buffer.as_raw());
    (data.next.cmd_draw_indexed)(
        command_buffer,
        index_count,
        instance_count,
        first_index,
        vertex_offset,
        first_instance,
    );
    data.tables.command_buffers.record(
        command_buffer,
        Command::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        },
    );
}

pub(crate) unsafe extern "system" fn queue_submit(
    queue: vk::Queue,
    submit_count: u32,
    p_submits: *const vk::SubmitInfo<'_>,
    fence: vk::Fence,
) -> vk::Result {
    let data = device_data(queue.as_raw());
    let capture = global();

    for s in 0..submit_count as usize {
        let submit = &*p_submits.add(s);
        for c in 0..submit.command_buffer_count as usize {
            let command_buffer = *submit.p_command_buffers.add(c);
            data.tables.command_buffers.submit(command_buffer, |commands| {
                let pool = data
                    .command_buffer_pools
                    .get(&command_buffer)
                    .map(|entry| *entry.value());
                let readback = StagingReadback::new(&data, pool);
                let disassembler = WordListDisassembler;
                let ctx = CaptureContext {
                    settings: &capture.settings,
                    draw_counter: &capture.draw_counter,
                    tables: &data.tables,
                    readback: &readback,
                    disassembler: &disassembler,
                };
                if let Err(err) = DrawCallTracker::new(ctx, queue).replay(commands) {
                    error!(%err, "draw call capture failed");
                    panic!("draw call capture failed: {err}");
                }
            });
        }
    }

    (data.next.queue_submit)(queue, submit_count, p_submits, fence)
}
