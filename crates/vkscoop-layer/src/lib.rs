//! The vkscoop Vulkan layer (`VK_LAYER_vkscoop_capture`).
//!
//! A loader-injected implicit/explicit layer that chains every intercepted
//! entry point through to the next layer untouched, shadow-records the
//! commands the capture engine cares about, and reconstructs selected draw
//! calls into Amber scene files at queue submit.

mod buffer_copy;
mod commands;
mod device;
mod global;
mod instance;
mod layer_link;
mod state;

use std::ffi::{c_char, CStr};

use ash::vk;

/// Resolve one of our intercepted entry points by name.
///
/// Both proc-addr entry points funnel through here so instance- and
/// device-level queries hand out the same interceptors.
fn intercepted_function(name: &str) -> vk::PFN_vkVoidFunction {
    macro_rules! entry {
        ($f:expr) => {
            Some(unsafe {
                std::mem::transmute::<*const (), unsafe extern "system" fn()>($f as *const ())
            })
        };
    }

    match name {
        "vkGetInstanceProcAddr" => entry!(instance::get_instance_proc_addr),
        "vkGetDeviceProcAddr" => entry!(device::get_device_proc_addr),
        "vkCreateInstance" => entry!(instance::create_instance),
        "vkDestroyInstance" => entry!(instance::destroy_instance),
        "vkCreateDevice" => entry!(device::create_device),
        "vkDestroyDevice" => entry!(device::destroy_device),
        "vkEnumerateInstanceLayerProperties" => {
            entry!(instance::enumerate_instance_layer_properties)
        }
        "vkEnumerateDeviceLayerProperties" => entry!(instance::enumerate_device_layer_properties),
        "vkEnumerateInstanceExtensionProperties" => {
            entry!(instance::enumerate_instance_extension_properties)
        }
        "vkEnumerateDeviceExtensionProperties" => {
            entry!(instance::enumerate_device_extension_properties)
        }
        "vkCreateShaderModule" => entry!(state::create_shader_module),
        "vkDestroyShaderModule" => entry!(state::destroy_shader_module),
        "vkCreateGraphicsPipelines" => entry!(state::create_graphics_pipelines),
        "vkDestroyPipeline" => entry!(state::destroy_pipeline),
        "vkCreateBuffer" => entry!(state::create_buffer),
        "vkDestroyBuffer" => entry!(state::destroy_buffer),
        "vkCreateDescriptorSetLayout" => entry!(state::create_descriptor_set_layout),
        "vkCreatePipelineLayout" => entry!(state::create_pipeline_layout),
        "vkAllocateDescriptorSets" => entry!(state::allocate_descriptor_sets),
        "vkUpdateDescriptorSets" => entry!(state::update_descriptor_sets),
        "vkAllocateCommandBuffers" => entry!(state::allocate_command_buffers),
        "vkFreeCommandBuffers" => entry!(state::free_command_buffers),
        "vkCmdBeginRenderPass" => entry!(commands::cmd_begin_render_pass),
        "vkCmdBindPipeline" => entry!(commands::cmd_bind_pipeline),
        "vkCmdBindIndexBuffer" => entry!(commands::cmd_bind_index_buffer),
        "vkCmdBindVertexBuffers" => entry!(commands::cmd_bind_vertex_buffers),
        "vkCmdPipelineBarrier" => entry!(commands::cmd_pipeline_barrier),
        "vkCmdDraw" => entry!(commands::cmd_draw),
        "vkCmdDrawIndexed" => entry!(commands::cmd_draw_indexed),
        "vkQueueSubmit" => entry!(commands::queue_submit),
        _ => None,
    }
}

/// # Safety
/// `p_name` must be a valid C string.
unsafe fn name_from_ptr<'a>(p_name: *const c_char) -> Option<&'a str> {
    if p_name.is_null() {
        return None;
    }
    CStr::from_ptr(p_name).to_str().ok()
}

/// Loader negotiation entry point, interface version 2.
///
/// # Safety
/// Called by the Vulkan loader with a valid negotiation struct.
#[no_mangle]
pub unsafe extern "C" fn VkLayer_vkscoopNegotiateLoaderLayerInterfaceVersion(
    p_interface: *mut layer_link::VkNegotiateLayerInterface,
) -> vk::Result {
    if p_interface.is_null() {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }
    let interface = &mut *p_interface;
    if interface.s_type != layer_link::LAYER_NEGOTIATE_INTERFACE_STRUCT {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }
    if interface.loader_layer_interface_version < 2 {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }
    interface.loader_layer_interface_version = 2;
    interface.pfn_get_instance_proc_addr = Some(instance::get_instance_proc_addr);
    interface.pfn_get_device_proc_addr = Some(device::get_device_proc_addr);
    interface.pfn_get_physical_device_proc_addr = None;
    vk::Result::SUCCESS
}

/// # Safety
/// Called by the Vulkan loader per the layer interface.
#[no_mangle]
pub unsafe extern "system" fn VkLayer_vkscoopGetInstanceProcAddr(
    instance: vk::Instance,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    instance::get_instance_proc_addr(instance, p_name)
}

/// # Safety
/// Called by the Vulkan loader per the layer interface.
#[no_mangle]
pub unsafe extern "system" fn VkLayer_vkscoopGetDeviceProcAddr(
    device: vk::Device,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    device::get_device_proc_addr(device, p_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_recorded_command_is_intercepted() {
        for name in [
            "vkCmdBeginRenderPass",
            "vkCmdBindPipeline",
            "vkCmdBindIndexBuffer",
            "vkCmdBindVertexBuffers",
            "vkCmdPipelineBarrier",
            "vkCmdDraw",
            "vkCmdDrawIndexed",
            "vkQueueSubmit",
        ] {
            assert!(intercepted_function(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn unknown_names_pass_through() {
        assert!(intercepted_function("vkCmdDispatch").is_none());
        assert!(intercepted_function("").is_none());
    }
}
