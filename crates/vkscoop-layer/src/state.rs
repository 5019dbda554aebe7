//! Object-creation interception: every call chains through first, then the
//! layer snapshots whatever the reconstructor will need at submit time.

use ash::vk;
use ash::vk::Handle;
use parking_lot::Mutex;
use tracing::{debug, error};

use vkscoop_capture::deep_copy::{
    copy_array, BufferCreateSnapshot, DescriptorSetLayoutSnapshot, GraphicsPipelineCreateSnapshot,
    PipelineLayoutSnapshot,
};
use vkscoop_capture::descriptor::{DescriptorSetState, DescriptorWriteSnapshot};
use vkscoop_capture::tables::{GraphicsPipelineState, ShaderModuleState};

use crate::device::device_data;

pub(crate) unsafe extern "system" fn create_shader_module(
    device: vk::Device,
    p_create_info: *const vk::ShaderModuleCreateInfo<'_>,
    p_allocator: *const vk::AllocationCallbacks<'_>,
    p_shader_module: *mut vk::ShaderModule,
) -> vk::Result {
    let data = device_data(device.as_raw());
    let result = (data.next.create_shader_module)(device, p_create_info, p_allocator, p_shader_module);
    if result == vk::Result::SUCCESS {
        let info = &*p_create_info;
        // code_size is in bytes, the code itself is words.
        let code = copy_array(info.p_code, info.code_size / 4, 0);
        let module = *p_shader_module;
        data.tables.shader_modules.put(module, ShaderModuleState::new(code));
        debug!(module = module.as_raw(), words = info.code_size / 4, "shader module tracked");
    }
    result
}

pub(crate) unsafe extern "system" fn destroy_shader_module(
    device: vk::Device,
    shader_module: vk::ShaderModule,
    p_allocator: *const vk::AllocationCallbacks<'_>,
) {
    let data = device_data(device.as_raw());
    if shader_module != vk::ShaderModule::null() {
        match data.tables.shader_modules.get(&shader_module) {
            Some(state) => {
                state.set_destroyed();
                // The entry stays while a pipeline still references the
                // module; vkDestroyPipeline evicts it later.
                if state.reclaimable() {
                    data.tables.shader_modules.remove(&shader_module);
                }
            }
            None => {
                error!(module = shader_module.as_raw(), "destroy of untracked shader module");
                panic!("destroy of untracked shader module");
            }
        }
    }
    (data.next.destroy_shader_module)(device, shader_module, p_allocator);
}

pub(crate) unsafe extern "system" fn create_graphics_pipelines(
    device: vk::Device,
    pipeline_cache: vk::PipelineCache,
    create_info_count: u32,
    p_create_infos: *const vk::GraphicsPipelineCreateInfo<'_>,
    p_allocator: *const vk::AllocationCallbacks<'_>,
    p_pipelines: *mut vk::Pipeline,
) -> vk::Result {
    let data = device_data(device.as_raw());
    let result = (data.next.create_graphics_pipelines)(
        device,
        pipeline_cache,
        create_info_count,
        p_create_infos,
        p_allocator,
        p_pipelines,
    );
    if result == vk::Result::SUCCESS {
        for i in 0..create_info_count as usize {
            let pipeline = *p_pipelines.add(i);
            if pipeline == vk::Pipeline::null() {
                continue;
            }
            let snapshot = GraphicsPipelineCreateSnapshot::capture(&*p_create_infos.add(i));
            let mut state = GraphicsPipelineState::new(snapshot);
            let modules: Vec<vk::ShaderModule> =
                state.create_info.stages.iter().map(|s| s.module).collect();
            for module in modules {
                let module_state = match data.tables.shader_modules.get(&module) {
                    Some(module_state) => module_state,
                    None => {
                        error!(module = module.as_raw(), "pipeline references an untracked shader module");
                        panic!("pipeline references an untracked shader module");
                    }
                };
                module_state.add_pipeline(pipeline);
                state.add_shader_module(module, module_state);
            }
            data.tables.graphics_pipelines.put(pipeline, state);
            debug!(pipeline = pipeline.as_raw(), "graphics pipeline tracked");
        }
    }
    result
}

pub(crate) unsafe extern "system" fn destroy_pipeline(
    device: vk::Device,
    pipeline: vk::Pipeline,
    p_allocator: *const vk::AllocationCallbacks<'_>,
) {
    let data = device_data(device.as_raw());
    if pipeline != vk::Pipeline::null() {
        if let Some(state) = data.tables.graphics_pipelines.remove(&pipeline) {
            for (module, module_state) in state.shader_modules() {
                module_state.remove_pipeline(pipeline);
                if module_state.reclaimable() {
                    data.tables.shader_modules.remove(&module);
                }
            }
        }
    }
    (data.next.destroy_pipeline)(device, pipeline, p_allocator);
}

pub(crate) unsafe extern "system" fn create_buffer(
    device: vk::Device,
    p_create_info: *const vk::BufferCreateInfo<'_>,
    p_allocator: *const vk::AllocationCallbacks<'_>,
    p_buffer: *mut vk::Buffer,
) -> vk::Result {
    let data = device_data(device.as_raw());
    let result = (data.next.create_buffer)(device, p_create_info, p_allocator, p_buffer);
    if result == vk::Result::SUCCESS {
        data.tables
            .buffers
            .put(*p_buffer, BufferCreateSnapshot::capture(&*p_create_info));
    }
    result
}

pub(crate) unsafe extern "system" fn destroy_buffer(
    device: vk::Device,
    buffer: vk::Buffer,
    p_allocator: *const vk::AllocationCallbacks<'_>,
) {
    let data = device_data(device.as_raw());
    if buffer != vk::Buffer::null() {
        data.tables.buffers.remove(&buffer);
    }
    (data.next.destroy_buffer)(device, buffer, p_allocator);
}

pub(crate) unsafe extern "system" fn create_descriptor_set_layout(
    device: vk::Device,
    p_create_info: *const vk::DescriptorSetLayoutCreateInfo<'_>,
    p_allocator: *const vk::AllocationCallbacks<'_>,
    p_set_layout: *mut vk::DescriptorSetLayout,
) -> vk::Result {
    let data = device_data(device.as_raw());
    let result =
        (data.next.create_descriptor_set_layout)(device, p_create_info, p_allocator, p_set_layout);
    if result == vk::Result::SUCCESS {
        data.tables.descriptor_set_layouts.put(
            *p_set_layout,
            DescriptorSetLayoutSnapshot::capture(&*p_create_info),
        );
    }
    result
}

pub(crate) unsafe extern "system" fn create_pipeline_layout(
    device: vk::Device,
    p_create_info: *const vk::PipelineLayoutCreateInfo<'_>,
    p_allocator: *const vk::AllocationCallbacks<'_>,
    p_pipeline_layout: *mut vk::PipelineLayout,
) -> vk::Result {
    let data = device_data(device.as_raw());
    let result =
        (data.next.create_pipeline_layout)(device, p_create_info, p_allocator, p_pipeline_layout);
    if result == vk::Result::SUCCESS {
        data.tables
            .pipeline_layouts
            .put(*p_pipeline_layout, PipelineLayoutSnapshot::capture(&*p_create_info));
    }
    result
}

pub(crate) unsafe extern "system" fn allocate_descriptor_sets(
    device: vk::Device,
    p_allocate_info: *const vk::DescriptorSetAllocateInfo<'_>,
    p_descriptor_sets: *mut vk::DescriptorSet,
) -> vk::Result {
    let data = device_data(device.as_raw());
    let result = (data.next.allocate_descriptor_sets)(device, p_allocate_info, p_descriptor_sets);
    if result == vk::Result::SUCCESS {
        let info = &*p_allocate_info;
        for i in 0..info.descriptor_set_count as usize {
            let layout = *info.p_set_layouts.add(i);
            let set = *p_descriptor_sets.add(i);
            let layout_snapshot = match data.tables.descriptor_set_layouts.get(&layout) {
                Some(snapshot) => snapshot,
                None => {
                    error!(layout = layout.as_raw(), "descriptor set allocated from an untracked layout");
                    panic!("descriptor set allocated from an untracked layout");
                }
            };
            data.tables
                .descriptor_sets
                .put(set, Mutex::new(DescriptorSetState::new(layout_snapshot)));
        }
    }
    result
}

pub(crate) unsafe extern "system" fn update_descriptor_sets(
    device: vk::Device,
    descriptor_write_count: u32,
    p_descriptor_writes: *const vk::WriteDescriptorSet<'_>,
    descriptor_copy_count: u32,
    p_descriptor_copies: *const vk::CopyDescriptorSet<'_>,
) {
    let data = device_data(device.as_raw());
    (data.next.update_descriptor_sets)(
        device,
        descriptor_write_count,
        p_descriptor_writes,
        descriptor_copy_count,
        p_descriptor_copies,
    );
    if descriptor_copy_count > 0 {
        error!(count = descriptor_copy_count, "descriptor copies are not supported");
        panic!("descriptor copies are not supported");
    }
    for i in 0..descriptor_write_count as usize {
        let write = &*p_descriptor_writes.add(i);
        let snapshot = DescriptorWriteSnapshot::capture(write);
        let set_state = match data.tables.descriptor_sets.get(&write.dst_set) {
            Some(state) => state,
            None => {
                error!(set = write.dst_set.as_raw(), "write targets an untracked descriptor set");
                panic!("write targets an untracked descriptor set");
            }
        };
        set_state.lock().write(&snapshot);
    }
}

pub(crate) unsafe extern "system" fn allocate_command_buffers(
    device: vk::Device,
    p_allocate_info: *const vk::CommandBufferAllocateInfo<'_>,
    p_command_buffers: *mut vk::CommandBuffer,
) -> vk::Result {
    let data = device_data(device.as_raw());
    let result = (data.next.allocate_command_buffers)(device, p_allocate_info, p_command_buffers);
    if result == vk::Result::SUCCESS {
        let info = &*p_allocate_info;
        for i in 0..info.command_buffer_count as usize {
            data.command_buffer_pools
                .insert(*p_command_buffers.add(i), info.command_pool);
        }
    }
    result
}

pub(crate) unsafe extern "system" fn free_command_buffers(
    device: vk::Device,
    command_pool: vk::CommandPool,
    command_buffer_count: u32,
    p_command_buffers: *const vk::CommandBuffer,
) {
    let data = device_data(device.as_raw());
    for i in 0..command_buffer_count as usize {
        let command_buffer = *p_command_buffers.add(i);
        data.command_buffer_pools.remove(&command_buffer);
        data.tables.command_buffers.remove(command_buffer);
    }
    (data.next.free_command_buffers)(device, command_pool, command_buffer_count, p_command_buffers);
}
