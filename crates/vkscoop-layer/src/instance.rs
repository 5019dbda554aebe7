//! Instance-level interception: creation, destruction, proc-addr
//! resolution and layer/extension enumeration.

use std::ffi::c_char;
use std::sync::OnceLock;

use ash::vk;
use ash::vk::Handle;
use tracing::{debug, error, info};

use vkscoop_core::stale_map;

use crate::global;
use crate::layer_link::{self, dispatch_key};

pub const LAYER_NAME: &str = "VK_LAYER_vkscoop_capture";
const LAYER_DESCRIPTION: &str = "Draw call capture layer writing Amber scene files";

/// Down-chain entry points of one instance, keyed by dispatch key.
pub struct InstanceData {
    pub instance: vk::Instance,
    pub next_get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
    pub destroy_instance: vk::PFN_vkDestroyInstance,
    pub get_physical_device_memory_properties: vk::PFN_vkGetPhysicalDeviceMemoryProperties,
    pub enumerate_device_extension_properties: vk::PFN_vkEnumerateDeviceExtensionProperties,
}

stale_map!(pub InstanceMap, INSTANCE_DATA_CACHE, InstanceData);

static INSTANCES: OnceLock<InstanceMap> = OnceLock::new();

pub fn instance_map() -> &'static InstanceMap {
    INSTANCES.get_or_init(InstanceMap::new)
}

/// Instance data for any dispatchable handle belonging to the instance
/// (the instance itself or one of its physical devices).
pub unsafe fn instance_data(handle_raw: u64) -> std::sync::Arc<InstanceData> {
    match instance_map().get(dispatch_key(handle_raw)) {
        Some(data) => data,
        None => {
            error!(handle = handle_raw, "handle belongs to an untracked instance");
            panic!("handle belongs to an untracked instance");
        }
    }
}

pub(crate) unsafe extern "system" fn create_instance(
    p_create_info: *const vk::InstanceCreateInfo<'_>,
    p_allocator: *const vk::AllocationCallbacks<'_>,
    p_instance: *mut vk::Instance,
) -> vk::Result {
    // First entry point the loader calls; bring up logging and settings.
    let _ = global::global();

    if p_create_info.is_null() || p_instance.is_null() {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }
    let chain = layer_link::find_instance_layer_link((*p_create_info).p_next);
    if chain.is_null() {
        error!("no loader instance link in the create-info chain");
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }
    let link = (*chain).p_layer_info;
    if link.is_null() {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }
    let next_gipa = (*link).pfn_next_get_instance_proc_addr;
    // Advance the link so the next layer down finds its own entry.
    (*chain).p_layer_info = (*link).p_next;

    let create_next: vk::PFN_vkCreateInstance =
        match next_gipa(vk::Instance::null(), c"vkCreateInstance".as_ptr()) {
            Some(f) => std::mem::transmute(f),
            None => return vk::Result::ERROR_INITIALIZATION_FAILED,
        };
    let result = create_next(p_create_info, p_allocator, p_instance);
    if result != vk::Result::SUCCESS {
        return result;
    }
    let instance = *p_instance;

    macro_rules! load {
        ($name:literal) => {
            match next_gipa(instance, $name.as_ptr()) {
                Some(f) => std::mem::transmute(f),
                None => {
                    error!(name = ?$name, "next layer does not expose a core entry point");
                    panic!("next layer does not expose a core entry point");
                }
            }
        };
    }

    let data = InstanceData {
        instance,
        next_get_instance_proc_addr: next_gipa,
        destroy_instance: load!(c"vkDestroyInstance"),
        get_physical_device_memory_properties: load!(c"vkGetPhysicalDeviceMemoryProperties"),
        enumerate_device_extension_properties: load!(c"vkEnumerateDeviceExtensionProperties"),
    };
    instance_map().put(dispatch_key(instance.as_raw()), data);
    info!(instance = instance.as_raw(), "instance created");
    result
}

pub(crate) unsafe extern "system" fn destroy_instance(
    instance: vk::Instance,
    p_allocator: *const vk::AllocationCallbacks<'_>,
) {
    // The map entry stays; stale lookups must keep working.
    let data = instance_data(instance.as_raw());
    debug!(instance = instance.as_raw(), "instance destroyed");
    (data.destroy_instance)(instance, p_allocator);
}

pub(crate) unsafe extern "system" fn get_instance_proc_addr(
    instance: vk::Instance,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    let name = crate::name_from_ptr(p_name)?;
    if let Some(intercepted) = crate::intercepted_function(name) {
        return Some(intercepted);
    }
    if instance == vk::Instance::null() {
        return None;
    }
    let data = instance_map().get(dispatch_key(instance.as_raw()))?;
    (data.next_get_instance_proc_addr)(instance, p_name)
}

fn write_c_chars(dst: &mut [c_char], src: &str) {
    for (slot, byte) in dst.iter_mut().zip(src.bytes()) {
        *slot = byte as c_char;
    }
}

unsafe fn write_layer_properties(
    p_property_count: *mut u32,
    p_properties: *mut vk::LayerProperties,
) -> vk::Result {
    if p_property_count.is_null() {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }
    if p_properties.is_null() {
        *p_property_count = 1;
        return vk::Result::SUCCESS;
    }
    if *p_property_count < 1 {
        *p_property_count = 0;
        return vk::Result::INCOMPLETE;
    }
    let mut properties = vk::LayerProperties {
        spec_version: vk::make_api_version(0, 1, 1, 0),
        implementation_version: 1,
        ..Default::default()
    };
    write_c_chars(&mut properties.layer_name, LAYER_NAME);
    write_c_chars(&mut properties.description, LAYER_DESCRIPTION);
    *p_properties = properties;
    *p_property_count = 1;
    vk::Result::SUCCESS
}

pub(crate) unsafe extern "system" fn enumerate_instance_layer_properties(
    p_property_count: *mut u32,
    p_properties: *mut vk::LayerProperties,
) -> vk::Result {
    write_layer_properties(p_property_count, p_properties)
}

pub(crate) unsafe extern "system" fn enumerate_device_layer_properties(
    _physical_device: vk::PhysicalDevice,
    p_property_count: *mut u32,
    p_properties: *mut vk::LayerProperties,
) -> vk::Result {
    write_layer_properties(p_property_count, p_properties)
}

unsafe fn is_this_layer(p_layer_name: *const c_char) -> bool {
    matches!(crate::name_from_ptr(p_layer_name), Some(name) if name == LAYER_NAME)
}

pub(crate) unsafe extern "system" fn enumerate_instance_extension_properties(
    p_layer_name: *const c_char,
    p_property_count: *mut u32,
    _p_properties: *mut vk::ExtensionProperties,
) -> vk::Result {
    // The loader only routes queries for this layer here; it answers
    // queries for other layers itself.
    if !is_this_layer(p_layer_name) {
        return vk::Result::ERROR_LAYER_NOT_PRESENT;
    }
    if !p_property_count.is_null() {
        *p_property_count = 0;
    }
    vk::Result::SUCCESS
}

pub(crate) unsafe extern "system" fn enumerate_device_extension_properties(
    physical_device: vk::PhysicalDevice,
    p_layer_name: *const c_char,
    p_property_count: *mut u32,
    p_properties: *mut vk::ExtensionProperties,
) -> vk::Result {
    if is_this_layer(p_layer_name) {
        if !p_property_count.is_null() {
            *p_property_count = 0;
        }
        return vk::Result::SUCCESS;
    }
    let data = instance_data(physical_device.as_raw());
    (data.enumerate_device_extension_properties)(
        physical_device,
        p_layer_name,
        p_property_count,
        p_properties,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_of(properties: &vk::LayerProperties) -> String {
        properties
            .layer_name
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8 as char)
            .collect()
    }

    #[test]
    fn layer_enumeration_reports_exactly_this_layer() {
        let mut count = 0u32;
        let result = unsafe { write_layer_properties(&mut count, std::ptr::null_mut()) };
        match result {
            vk::Result::SUCCESS => {}
            other => panic!("count query failed: {other:?}"),
        }
        assert_eq!(count, 1);

        let mut properties = vk::LayerProperties::default();
        let result = unsafe { write_layer_properties(&mut count, &mut properties) };
        match result {
            vk::Result::SUCCESS => {}
            other => panic!("property query failed: {other:?}"),
        }
        assert_eq!(name_of(&properties), LAYER_NAME);
        assert_eq!(properties.spec_version, vk::make_api_version(0, 1, 1, 0));
    }

    #[test]
    fn zero_capacity_query_reports_incomplete() {
        let mut count = 0u32;
        let mut properties = vk::LayerProperties::default();
        let result = unsafe { write_layer_properties(&mut count, &mut properties) };
        match result {
            vk::Result::INCOMPLETE => {}
            other => panic!("expected INCOMPLETE, got {other:?}"),
        }
        assert_eq!(count, 0);
    }
}
