//! Device-level dispatch: the down-chain device table, per-device capture
//! state and device creation/destruction.

use std::ffi::c_char;
use std::sync::{Arc, OnceLock};

use ash::vk;
use ash::vk::Handle;
use dashmap::DashMap;
use tracing::{debug, error, info};

use vkscoop_capture::DeviceTables;
use vkscoop_core::stale_map;

use crate::layer_link::{self, dispatch_key};

/// Down-chain entry points of one device.
pub struct DeviceDispatch {
    pub get_device_proc_addr: vk::PFN_vkGetDeviceProcAddr,
    pub destroy_device: vk::PFN_vkDestroyDevice,
    pub create_shader_module: vk::PFN_vkCreateShaderModule,
    pub destroy_shader_module: vk::PFN_vkDestroyShaderModule,
    pub create_graphics_pipelines: vk::PFN_vkCreateGraphicsPipelines,
    pub destroy_pipeline: vk::PFN_vkDestroyPipeline,
    pub create_buffer: vk::PFN_vkCreateBuffer,
    pub destroy_buffer: vk::PFN_vkDestroyBuffer,
    pub create_descriptor_set_layout: vk::PFN_vkCreateDescriptorSetLayout,
    pub create_pipeline_layout: vk::PFN_vkCreatePipelineLayout,
    pub allocate_descriptor_sets: vk::PFN_vkAllocateDescriptorSets,
    pub update_descriptor_sets: vk::PFN_vkUpdateDescriptorSets,
    pub allocate_command_buffers: vk::PFN_vkAllocateCommandBuffers,
    pub free_command_buffers: vk::PFN_vkFreeCommandBuffers,
    pub begin_command_buffer: vk::PFN_vkBeginCommandBuffer,
    pub end_command_buffer: vk::PFN_vkEndCommandBuffer,
    pub queue_submit: vk::PFN_vkQueueSubmit,
    pub cmd_begin_render_pass: vk::PFN_vkCmdBeginRenderPass,
    pub cmd_bind_pipeline: vk::PFN_vkCmdBindPipeline,
    pub cmd_bind_index_buffer: vk::PFN_vkCmdBindIndexBuffer,
    pub cmd_bind_vertex_buffers: vk::PFN_vkCmdBindVertexBuffers,
    pub cmd_pipeline_barrier: vk::PFN_vkCmdPipelineBarrier,
    pub cmd_draw: vk::PFN_vkCmdDraw,
    pub cmd_draw_indexed: vk::PFN_vkCmdDrawIndexed,
    pub cmd_copy_buffer: vk::PFN_vkCmdCopyBuffer,
    pub get_buffer_memory_requirements: vk::PFN_vkGetBufferMemoryRequirements,
    pub bind_buffer_memory: vk::PFN_vkBindBufferMemory,
    pub allocate_memory: vk::PFN_vkAllocateMemory,
    pub free_memory: vk::PFN_vkFreeMemory,
    pub map_memory: vk::PFN_vkMapMemory,
    pub unmap_memory: vk::PFN_vkUnmapMemory,
    pub invalidate_mapped_memory_ranges: vk::PFN_vkInvalidateMappedMemoryRanges,
    pub create_fence: vk::PFN_vkCreateFence,
    pub destroy_fence: vk::PFN_vkDestroyFence,
    pub wait_for_fences: vk::PFN_vkWaitForFences,
}

/// Everything the layer tracks for one device.
pub struct DeviceData {
    pub device: vk::Device,
    pub physical_device: vk::PhysicalDevice,
    /// Dispatch key of the owning instance, for instance-level lookups.
    pub instance_key: usize,
    pub next: DeviceDispatch,
    pub tables: DeviceTables,
    /// Pool each tracked command buffer was allocated from; read back
    /// copies allocate their transient command buffer from the same pool.
    pub command_buffer_pools: DashMap<vk::CommandBuffer, vk::CommandPool>,
}

stale_map!(pub DeviceMap, DEVICE_DATA_CACHE, DeviceData);

static DEVICES: OnceLock<DeviceMap> = OnceLock::new();

pub fn device_map() -> &'static DeviceMap {
    DEVICES.get_or_init(DeviceMap::new)
}

/// Device data for any dispatchable handle belonging to the device (the
/// device itself, a queue or a command buffer).
pub unsafe fn device_data(handle_raw: u64) -> Arc<DeviceData> {
    match device_map().get(dispatch_key(handle_raw)) {
        Some(data) => data,
        None => {
            error!(handle = handle_raw, "handle belongs to an untracked device");
            panic!("handle belongs to an untracked device");
        }
    }
}

pub(crate) unsafe extern "system" fn create_device(
    physical_device: vk::PhysicalDevice,
    p_create_info: *const vk::DeviceCreateInfo<'_>,
    p_allocator: *const vk::AllocationCallbacks<'_>,
    p_device: *mut vk::Device,
) -> vk::Result {
    if p_create_info.is_null() || p_device.is_null() {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }
    let chain = layer_link::find_device_layer_link((*p_create_info).p_next);
    if chain.is_null() {
        error!("no loader device link in the create-info chain");
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }
    let link = (*chain).p_layer_info;
    if link.is_null() {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }
    let next_gipa = (*link).pfn_next_get_instance_proc_addr;
    let next_gdpa = (*link).pfn_next_get_device_proc_addr;
    (*chain).p_layer_info = (*link).p_next;

    let create_next: vk::PFN_vkCreateDevice =
        match next_gipa(vk::Instance::null(), c"vkCreateDevice".as_ptr()) {
            Some(f) => std::mem::transmute(f),
            None => return vk::Result::ERROR_INITIALIZATION_FAILED,
        };
    let result = create_next(physical_device, p_create_info, p_allocator, p_device);
    if result != vk::Result::SUCCESS {
        return result;
    }
    let device = *p_device;

    macro_rules! load {
        ($name:literal) => {
            match next_gdpa(device, $name.as_ptr()) {
                Some(f) => std::mem::transmute(f),
                None => {
                    error!(name = ?$name, "next layer does not expose a core entry point");
                    return vk::Result::ERROR_INITIALIZATION_FAILED;
                }
            }
        };
    }

    let next = DeviceDispatch {
        get_device_proc_addr: next_gdpa,
        destroy_device: load!(c"vkDestroyDevice"),
        create_shader_module: load!(c"vkCreateShaderModule"),
        destroy_shader_module: load!(c"vkDestroyShaderModule"),
        create_graphics_pipelines: load!(c"vkCreateGraphicsPipelines"),
        destroy_pipeline: load!(c"vkDestroyPipeline"),
        create_buffer: load!(c"vkCreateBuffer"),
        destroy_buffer: load!(c"vkDestroyBuffer"),
        create_descriptor_set_layout: load!(c"vkCreateDescriptorSetLayout"),
        create_pipeline_layout: load!(c"vkCreatePipelineLayout"),
        allocate_descriptor_sets: load!(c"vkAllocateDescriptorSets"),
        update_descriptor_sets: load!(c"vkUpdateDescriptorSets"),
        allocate_command_buffers: load!(c"vkAllocateCommandBuffers"),
        free_command_buffers: load!(c"vkFreeCommandBuffers"),
        begin_command_buffer: load!(c"vkBeginCommandBuffer"),
        end_command_buffer: load!(c"vkEndCommandBuffer"),
        queue_submit: load!(c"vkQueueSubmit"),
        cmd_begin_render_pass: load!(c"vkCmdBeginRenderPass"),
        cmd_bind_pipeline: load!(c"vkCmdBindPipeline"),
        cmd_bind_index_buffer: load!(c"vkCmdBindIndexBuffer"),
        cmd_bind_vertex_buffers: load!(c"vkCmdBindVertexBuffers"),
        cmd_pipeline_barrier: load!(c"vkCmdPipelineBarrier"),
        cmd_draw: load!(c"vkCmdDraw"),
        cmd_draw_indexed: load!(c"vkCmdDrawIndexed"),
        cmd_copy_buffer: load!(c"vkCmdCopyBuffer"),
        get_buffer_memory_requirements: load!(c"vkGetBufferMemoryRequirements"),
        bind_buffer_memory: load!(c"vkBindBufferMemory"),
        allocate_memory: load!(c"vkAllocateMemory"),
        free_memory: load!(c"vkFreeMemory"),
        map_memory: load!(c"vkMapMemory"),
        unmap_memory: load!(c"vkUnmapMemory"),
        invalidate_mapped_memory_ranges: load!(c"vkInvalidateMappedMemoryRanges"),
        create_fence: load!(c"vkCreateFence"),
        destroy_fence: load!(c"vkDestroyFence"),
        wait_for_fences: load!(c"vkWaitForFences"),
    };

    let data = DeviceData {
        device,
        physical_device,
        instance_key: dispatch_key(physical_device.as_raw()),
        next,
        tables: DeviceTables::new(),
        command_buffer_pools: DashMap::new(),
    };
    device_map().put(dispatch_key(device.as_raw()), data);
    info!(device = device.as_raw(), "device created");
    result
}

pub(crate) unsafe extern "system" fn destroy_device(
    device: vk::Device,
    p_allocator: *const vk::AllocationCallbacks<'_>,
) {
    // The map entry stays; stale lookups must keep working.
    let data = device_data(device.as_raw());
    debug!(device = device.as_raw(), "device destroyed");
    (data.next.destroy_device)(device, p_allocator);
}

pub(crate) unsafe extern "system" fn get_device_proc_addr(
    device: vk::Device,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    let name = crate::name_from_ptr(p_name)?;
    // Only device-level entry points are resolved here.
    match name {
        "vkGetDeviceProcAddr"
        | "vkDestroyDevice"
        | "vkCreateShaderModule"
        | "vkDestroyShaderModule"
        | "vkCreateGraphicsPipelines"
        | "vkDestroyPipeline"
        | "vkCreateBuffer"
        | "vkDestroyBuffer"
        | "vkCreateDescriptorSetLayout"
        | "vkCreatePipelineLayout"
        | "vkAllocateDescriptorSets"
        | "vkUpdateDescriptorSets"
        | "vkAllocateCommandBuffers"
        | "vkFreeCommandBuffers"
        | "vkCmdBeginRenderPass"
        | "vkCmdBindPipeline"
        | "vkCmdBindIndexBuffer"
        | "vkCmdBindVertexBuffers"
        | "vkCmdPipelineBarrier"
        | "vkCmdDraw"
        | "vkCmdDrawIndexed"
        | "vkQueueSubmit" => crate::intercepted_function(name),
        _ => {
            if device == vk::Device::null() {
                return None;
            }
            let data = device_map().get(dispatch_key(device.as_raw()))?;
            (data.next.get_device_proc_addr)(device, p_name)
        }
    }
}
