//! Loader/layer interface structures.
//!
//! The loader threads a `VkLayerInstanceCreateInfo` / `VkLayerDeviceCreateInfo`
//! through the create-info `pNext` chain so each layer can find the next
//! layer's proc-addr entry points. ash does not model these structs, so they
//! are declared here with the layout the loader interface specifies.

use std::ffi::c_void;

use ash::vk;

pub const LOADER_INSTANCE_CREATE_INFO: vk::StructureType = vk::StructureType::from_raw(47);
pub const LOADER_DEVICE_CREATE_INFO: vk::StructureType = vk::StructureType::from_raw(48);

/// `VkLayerFunction` value selecting the layer-link union member.
pub const LAYER_LINK_INFO: u32 = 0;

/// `VkNegotiateLayerStructType::LAYER_NEGOTIATE_INTERFACE_STRUCT`.
pub const LAYER_NEGOTIATE_INTERFACE_STRUCT: i32 = 1;

#[repr(C)]
pub struct VkLayerInstanceLink {
    pub p_next: *mut VkLayerInstanceLink,
    pub pfn_next_get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
    pub pfn_next_get_physical_device_proc_addr: Option<unsafe extern "system" fn()>,
}

#[repr(C)]
pub struct VkLayerInstanceCreateInfo {
    pub s_type: vk::StructureType,
    pub p_next: *const c_void,
    pub function: u32,
    // First member of the union; the other members are not used when
    // `function == LAYER_LINK_INFO`.
    pub p_layer_info: *mut VkLayerInstanceLink,
}

#[repr(C)]
pub struct VkLayerDeviceLink {
    pub p_next: *mut VkLayerDeviceLink,
    pub pfn_next_get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
    pub pfn_next_get_device_proc_addr: vk::PFN_vkGetDeviceProcAddr,
}

#[repr(C)]
pub struct VkLayerDeviceCreateInfo {
    pub s_type: vk::StructureType,
    pub p_next: *const c_void,
    pub function: u32,
    pub p_layer_info: *mut VkLayerDeviceLink,
}

#[repr(C)]
pub struct VkNegotiateLayerInterface {
    pub s_type: i32,
    pub p_next: *mut c_void,
    pub loader_layer_interface_version: u32,
    pub pfn_get_instance_proc_addr: Option<vk::PFN_vkGetInstanceProcAddr>,
    pub pfn_get_device_proc_addr: Option<vk::PFN_vkGetDeviceProcAddr>,
    pub pfn_get_physical_device_proc_addr: Option<unsafe extern "system" fn()>,
}

#[repr(C)]
struct ChainHeader {
    s_type: vk::StructureType,
    p_next: *const c_void,
}

/// Walk an instance create-info `pNext` chain for the loader's layer link.
///
/// # Safety
/// `p_next` must be the head of a valid Vulkan structure chain.
pub unsafe fn find_instance_layer_link(
    p_next: *const c_void,
) -> *mut VkLayerInstanceCreateInfo {
    let mut cursor = p_next;
    while !cursor.is_null() {
        let header = &*(cursor as *const ChainHeader);
        if header.s_type == LOADER_INSTANCE_CREATE_INFO {
            let info = cursor as *mut VkLayerInstanceCreateInfo;
            if (*info).function == LAYER_LINK_INFO {
                return info;
            }
        }
        cursor = header.p_next;
    }
    std::ptr::null_mut()
}

/// Walk a device create-info `pNext` chain for the loader's layer link.
///
/// # Safety
/// `p_next` must be the head of a valid Vulkan structure chain.
pub unsafe fn find_device_layer_link(p_next: *const c_void) -> *mut VkLayerDeviceCreateInfo {
    let mut cursor = p_next;
    while !cursor.is_null() {
        let header = &*(cursor as *const ChainHeader);
        if header.s_type == LOADER_DEVICE_CREATE_INFO {
            let info = cursor as *mut VkLayerDeviceCreateInfo;
            if (*info).function == LAYER_LINK_INFO {
                return info;
            }
        }
        cursor = header.p_next;
    }
    std::ptr::null_mut()
}

/// The dispatch key of a dispatchable handle: the loader stores a dispatch
/// table pointer in the handle's first word, shared by all handles of one
/// instance or device.
///
/// # Safety
/// `handle_raw` must be the raw value of a live dispatchable handle.
pub unsafe fn dispatch_key(handle_raw: u64) -> usize {
    *(handle_raw as usize as *const usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_the_instance_link_behind_other_chain_entries() {
        let mut link_info = VkLayerInstanceCreateInfo {
            s_type: LOADER_INSTANCE_CREATE_INFO,
            p_next: std::ptr::null(),
            function: LAYER_LINK_INFO,
            p_layer_info: std::ptr::null_mut(),
        };
        let other = ChainHeader {
            s_type: vk::StructureType::APPLICATION_INFO,
            p_next: &link_info as *const VkLayerInstanceCreateInfo as *const c_void,
        };

        let found =
            unsafe { find_instance_layer_link(&other as *const ChainHeader as *const c_void) };
        assert_eq!(found, &mut link_info as *mut VkLayerInstanceCreateInfo);
    }

    #[test]
    fn skips_loader_entries_with_another_function_selector() {
        let link_info = VkLayerInstanceCreateInfo {
            s_type: LOADER_INSTANCE_CREATE_INFO,
            p_next: std::ptr::null(),
            // VK_LOADER_DATA_CALLBACK, not the layer link.
            function: 1,
            p_layer_info: std::ptr::null_mut(),
        };

        let found = unsafe {
            find_instance_layer_link(&link_info as *const VkLayerInstanceCreateInfo as *const c_void)
        };
        assert!(found.is_null());
    }

    #[test]
    fn empty_chain_has_no_device_link() {
        assert!(unsafe { find_device_layer_link(std::ptr::null()) }.is_null());
    }
}
