//! Synchronous buffer read-back over next-layer functions.
//!
//! The capture path needs the bytes of vertex and index buffers as the
//! submitted draws would see them. A staging buffer in host-visible memory
//! is filled with a one-shot transfer command buffer submitted on the
//! application's own queue, then mapped and copied out.

use std::ffi::c_void;

use ash::vk;
use ash::vk::Handle;

use vkscoop_capture::BufferReadback;
use vkscoop_core::ScoopError;

use crate::device::DeviceData;
use crate::instance::instance_map;

fn check(result: vk::Result, call: &'static str) -> Result<(), ScoopError> {
    if result == vk::Result::SUCCESS {
        Ok(())
    } else {
        Err(ScoopError::Driver {
            call,
            code: result.as_raw(),
        })
    }
}

/// Read-back implementation bound to one device and the command pool the
/// submitted command buffer came from.
pub struct StagingReadback<'a> {
    device: &'a DeviceData,
    pool: Option<vk::CommandPool>,
}

impl<'a> StagingReadback<'a> {
    pub fn new(device: &'a DeviceData, pool: Option<vk::CommandPool>) -> Self {
        Self { device, pool }
    }

    unsafe fn copy(
        &self,
        queue: vk::Queue,
        source: vk::Buffer,
        size: vk::DeviceSize,
    ) -> Result<Vec<u8>, ScoopError> {
        let pool = self.pool.ok_or_else(|| {
            ScoopError::Readback("submitted command buffer has no known command pool".into())
        })?;
        let next = &self.device.next;
        let device = self.device.device;

        let buffer_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(vk::BufferUsageFlags::TRANSFER_DST)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let mut staging = vk::Buffer::null();
        check(
            (next.create_buffer)(device, &buffer_info, std::ptr::null(), &mut staging),
            "vkCreateBuffer",
        )?;

        let mut requirements = vk::MemoryRequirements::default();
        (next.get_buffer_memory_requirements)(device, staging, &mut requirements);

        let instance = instance_map().get(self.device.instance_key).ok_or_else(|| {
            ScoopError::Readback("device has no tracked owning instance".into())
        })?;
        let mut memory_properties = vk::PhysicalDeviceMemoryProperties::default();
        (instance.get_physical_device_memory_properties)(
            self.device.physical_device,
            &mut memory_properties,
        );
        let memory_type_index = (0..memory_properties.memory_type_count)
            .find(|&i| {
                requirements.memory_type_bits & (1 << i) != 0
                    && memory_properties.memory_types[i as usize]
                        .property_flags
                        .contains(vk::MemoryPropertyFlags::HOST_VISIBLE)
            })
            .ok_or_else(|| {
                ScoopError::Readback("no host-visible memory type for the staging buffer".into())
            })?;

        let allocate_info = vk::MemoryAllocateInfo::default()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);
        let mut memory = vk::DeviceMemory::null();
        check(
            (next.allocate_memory)(device, &allocate_info, std::ptr::null(), &mut memory),
            "vkAllocateMemory",
        )?;
        check(
            (next.bind_buffer_memory)(device, staging, memory, 0),
            "vkBindBufferMemory",
        )?;

        let cb_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let mut copy_cb = vk::CommandBuffer::null();
        check(
            (next.allocate_command_buffers)(device, &cb_info, &mut copy_cb),
            "vkAllocateCommandBuffers",
        )?;
        // The command buffer came from the next layer; give it the same
        // dispatch pointer as the device so down-chain layers keying on it
        // route correctly.
        *(copy_cb.as_raw() as usize as *mut usize) =
            *(device.as_raw() as usize as *const usize);

        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        check(
            (next.begin_command_buffer)(copy_cb, &begin_info),
            "vkBeginCommandBuffer",
        )?;

        let before = vk::MemoryBarrier::default()
            .src_access_mask(vk::AccessFlags::MEMORY_WRITE)
            .dst_access_mask(vk::AccessFlags::TRANSFER_READ);
        (next.cmd_pipeline_barrier)(
            copy_cb,
            vk::PipelineStageFlags::ALL_COMMANDS,
            vk::PipelineStageFlags::TRANSFER,
            vk::DependencyFlags::empty(),
            1,
            &before,
            0,
            std::ptr::null(),
            0,
            std::ptr::null(),
        );
        let region = vk::BufferCopy::default().size(size);
        (next.cmd_copy_buffer)(copy_cb, source, staging, 1, &region);
        let after = vk::MemoryBarrier::default()
            .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
            .dst_access_mask(vk::AccessFlags::HOST_READ);
        (next.cmd_pipeline_barrier)(
            copy_cb,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::HOST,
            vk::DependencyFlags::empty(),
            1,
            &after,
            0,
            std::ptr::null(),
            0,
            std::ptr::null(),
        );
        check((next.end_command_buffer)(copy_cb), "vkEndCommandBuffer")?;

        let fence_info = vk::FenceCreateInfo::default();
        let mut copy_fence = vk::Fence::null();
        check(
            (next.create_fence)(device, &fence_info, std::ptr::null(), &mut copy_fence),
            "vkCreateFence",
        )?;
        let command_buffers = [copy_cb];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
        check(
            (next.queue_submit)(queue, 1, &submit_info, copy_fence),
            "vkQueueSubmit",
        )?;
        check(
            (next.wait_for_fences)(device, 1, &copy_fence, vk::TRUE, u64::MAX),
            "vkWaitForFences",
        )?;

        let mut mapped: *mut c_void = std::ptr::null_mut();
        check(
            (next.map_memory)(device, memory, 0, vk::WHOLE_SIZE, vk::MemoryMapFlags::empty(), &mut mapped),
            "vkMapMemory",
        )?;
        let range = vk::MappedMemoryRange::default()
            .memory(memory)
            .offset(0)
            .size(vk::WHOLE_SIZE);
        check(
            (next.invalidate_mapped_memory_ranges)(device, 1, &range),
            "vkInvalidateMappedMemoryRanges",
        )?;
        let mut contents = vec![0u8; size as usize];
        std::ptr::copy_nonoverlapping(mapped.cast::<u8>(), contents.as_mut_ptr(), size as usize);
        (next.unmap_memory)(device, memory);

        (next.destroy_fence)(device, copy_fence, std::ptr::null());
        (next.free_command_buffers)(device, pool, 1, &copy_cb);
        (next.destroy_buffer)(device, staging, std::ptr::null());
        (next.free_memory)(device, memory, std::ptr::null());

        Ok(contents)
    }
}

impl BufferReadback for StagingReadback<'_> {
    fn read_buffer(
        &self,
        queue: vk::Queue,
        buffer: vk::Buffer,
        size: vk::DeviceSize,
    ) -> Result<Vec<u8>, ScoopError> {
        unsafe { self.copy(queue, buffer, size) }
    }
}
