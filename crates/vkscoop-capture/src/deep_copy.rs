//! Owning snapshots of driver-owned create-info structures.
//!
//! Vulkan hands the layer pointers that are only valid for the duration of
//! the call, so anything consulted later (at queue submit) must be copied
//! out. Each snapshot type owns its storage; releasing it is `Drop`.
//!
//! The `capture` constructors are unsafe: the caller guarantees the source
//! struct and every array it points at are valid per the Vulkan spec for
//! that entry point.

use std::ffi::CStr;

use ash::vk;

/// Copy elements `[offset, count)` of a driver-owned array into a `Vec`.
///
/// A null pointer, or `count <= offset`, yields an empty `Vec`. Optional
/// array fields in create infos are null exactly when their count is zero,
/// so callers pass both through unconditionally.
///
/// # Safety
/// If `ptr` is non-null it must point to at least `count` valid elements.
pub unsafe fn copy_array<T: Copy>(ptr: *const T, count: usize, offset: usize) -> Vec<T> {
    if ptr.is_null() || count <= offset {
        return Vec::new();
    }
    std::slice::from_raw_parts(ptr.add(offset), count - offset).to_vec()
}

/// Everything `vkCmdBeginRenderPass` describes, with the clear values owned.
#[derive(Clone)]
pub struct RenderPassBeginSnapshot {
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
    pub render_area: vk::Rect2D,
    pub clear_values: Vec<vk::ClearValue>,
}

impl RenderPassBeginSnapshot {
    /// # Safety
    /// `info` must be a valid `VkRenderPassBeginInfo`.
    pub unsafe fn capture(info: &vk::RenderPassBeginInfo) -> Self {
        Self {
            render_pass: info.render_pass,
            framebuffer: info.framebuffer,
            render_area: info.render_area,
            clear_values: copy_array(info.p_clear_values, info.clear_value_count as usize, 0),
        }
    }
}

#[derive(Clone)]
pub struct SpecializationSnapshot {
    pub map_entries: Vec<vk::SpecializationMapEntry>,
    pub data: Vec<u8>,
}

impl SpecializationSnapshot {
    /// # Safety
    /// `info` must be a valid `VkSpecializationInfo`.
    pub unsafe fn capture(info: &vk::SpecializationInfo) -> Self {
        Self {
            map_entries: copy_array(info.p_map_entries, info.map_entry_count as usize, 0),
            data: copy_array(info.p_data.cast::<u8>(), info.data_size, 0),
        }
    }
}

/// One shader stage of a graphics pipeline. The module handle stays a
/// handle; the module's code lives in the shader-module state table.
#[derive(Clone)]
pub struct ShaderStageSnapshot {
    pub stage: vk::ShaderStageFlags,
    pub module: vk::ShaderModule,
    pub entry_point: String,
    pub specialization: Option<SpecializationSnapshot>,
}

impl ShaderStageSnapshot {
    /// # Safety
    /// `info` must be a valid `VkPipelineShaderStageCreateInfo`.
    pub unsafe fn capture(info: &vk::PipelineShaderStageCreateInfo) -> Self {
        Self {
            stage: info.stage,
            module: info.module,
            entry_point: CStr::from_ptr(info.p_name).to_string_lossy().into_owned(),
            specialization: info
                .p_specialization_info
                .as_ref()
                .map(|s| SpecializationSnapshot::capture(s)),
        }
    }
}

#[derive(Clone, Default)]
pub struct VertexInputSnapshot {
    pub bindings: Vec<vk::VertexInputBindingDescription>,
    pub attributes: Vec<vk::VertexInputAttributeDescription>,
}

impl VertexInputSnapshot {
    /// # Safety
    /// `info` must be a valid `VkPipelineVertexInputStateCreateInfo`.
    pub unsafe fn capture(info: &vk::PipelineVertexInputStateCreateInfo) -> Self {
        Self {
            bindings: copy_array(
                info.p_vertex_binding_descriptions,
                info.vertex_binding_description_count as usize,
                0,
            ),
            attributes: copy_array(
                info.p_vertex_attribute_descriptions,
                info.vertex_attribute_description_count as usize,
                0,
            ),
        }
    }
}

/// The slice of `VkGraphicsPipelineCreateInfo` the reconstructor consumes.
#[derive(Clone)]
pub struct GraphicsPipelineCreateSnapshot {
    pub stages: Vec<ShaderStageSnapshot>,
    pub vertex_input: VertexInputSnapshot,
    pub topology: vk::PrimitiveTopology,
    pub primitive_restart: bool,
    pub layout: vk::PipelineLayout,
    pub render_pass: vk::RenderPass,
    pub subpass: u32,
}

impl GraphicsPipelineCreateSnapshot {
    /// # Safety
    /// `info` must be a valid `VkGraphicsPipelineCreateInfo`.
    pub unsafe fn capture(info: &vk::GraphicsPipelineCreateInfo) -> Self {
        let stages = std::slice::from_raw_parts(info.p_stages, info.stage_count as usize)
            .iter()
            .map(|s| ShaderStageSnapshot::capture(s))
            .collect();

        // Vertex-fetch pipelines must carry both fixed-function states.
        let vertex_input = match info.p_vertex_input_state.as_ref() {
            Some(vi) => VertexInputSnapshot::capture(vi),
            None => {
                tracing::error!("graphics pipeline without vertex input state");
                panic!("graphics pipeline without vertex input state");
            }
        };
        let input_assembly = match info.p_input_assembly_state.as_ref() {
            Some(ia) => ia,
            None => {
                tracing::error!("graphics pipeline without input assembly state");
                panic!("graphics pipeline without input assembly state");
            }
        };

        Self {
            stages,
            vertex_input,
            topology: input_assembly.topology,
            primitive_restart: input_assembly.primitive_restart_enable != vk::FALSE,
            layout: info.layout,
            render_pass: info.render_pass,
            subpass: info.subpass,
        }
    }
}

#[derive(Clone)]
pub struct PipelineLayoutSnapshot {
    pub set_layouts: Vec<vk::DescriptorSetLayout>,
    pub push_constant_ranges: Vec<vk::PushConstantRange>,
}

impl PipelineLayoutSnapshot {
    /// # Safety
    /// `info` must be a valid `VkPipelineLayoutCreateInfo`.
    pub unsafe fn capture(info: &vk::PipelineLayoutCreateInfo) -> Self {
        Self {
            set_layouts: copy_array(info.p_set_layouts, info.set_layout_count as usize, 0),
            push_constant_ranges: copy_array(
                info.p_push_constant_ranges,
                info.push_constant_range_count as usize,
                0,
            ),
        }
    }
}

#[derive(Clone, Copy)]
pub struct LayoutBindingSnapshot {
    pub binding: u32,
    pub descriptor_type: vk::DescriptorType,
    pub descriptor_count: u32,
    pub stage_flags: vk::ShaderStageFlags,
}

#[derive(Clone)]
pub struct DescriptorSetLayoutSnapshot {
    pub bindings: Vec<LayoutBindingSnapshot>,
}

impl DescriptorSetLayoutSnapshot {
    /// # Safety
    /// `info` must be a valid `VkDescriptorSetLayoutCreateInfo`.
    pub unsafe fn capture(info: &vk::DescriptorSetLayoutCreateInfo) -> Self {
        let bindings = std::slice::from_raw_parts(info.p_bindings, info.binding_count as usize)
            .iter()
            .map(|b| LayoutBindingSnapshot {
                binding: b.binding,
                descriptor_type: b.descriptor_type,
                descriptor_count: b.descriptor_count,
                stage_flags: b.stage_flags,
            })
            .collect();
        Self { bindings }
    }
}

#[derive(Clone)]
pub struct BufferCreateSnapshot {
    pub size: vk::DeviceSize,
    pub usage: vk::BufferUsageFlags,
    pub sharing_mode: vk::SharingMode,
    pub queue_family_indices: Vec<u32>,
}

impl BufferCreateSnapshot {
    /// # Safety
    /// `info` must be a valid `VkBufferCreateInfo`.
    pub unsafe fn capture(info: &vk::BufferCreateInfo) -> Self {
        Self {
            size: info.size,
            usage: info.usage,
            sharing_mode: info.sharing_mode,
            queue_family_indices: copy_array(
                info.p_queue_family_indices,
                info.queue_family_index_count as usize,
                0,
            ),
        }
    }
}

#[derive(Clone, Copy)]
pub struct MemoryBarrierSnapshot {
    pub src_access_mask: vk::AccessFlags,
    pub dst_access_mask: vk::AccessFlags,
}

#[derive(Clone, Copy)]
pub struct BufferBarrierSnapshot {
    pub src_access_mask: vk::AccessFlags,
    pub dst_access_mask: vk::AccessFlags,
    pub src_queue_family_index: u32,
    pub dst_queue_family_index: u32,
    pub buffer: vk::Buffer,
    pub offset: vk::DeviceSize,
    pub size: vk::DeviceSize,
}

#[derive(Clone, Copy)]
pub struct ImageBarrierSnapshot {
    pub src_access_mask: vk::AccessFlags,
    pub dst_access_mask: vk::AccessFlags,
    pub old_layout: vk::ImageLayout,
    pub new_layout: vk::ImageLayout,
    pub src_queue_family_index: u32,
    pub dst_queue_family_index: u32,
    pub image: vk::Image,
    pub subresource_range: vk::ImageSubresourceRange,
}

/// Everything `vkCmdPipelineBarrier` describes, owned.
#[derive(Clone, Default)]
pub struct BarrierSnapshot {
    pub src_stage_mask: vk::PipelineStageFlags,
    pub dst_stage_mask: vk::PipelineStageFlags,
    pub dependency_flags: vk::DependencyFlags,
    pub memory_barriers: Vec<MemoryBarrierSnapshot>,
    pub buffer_barriers: Vec<BufferBarrierSnapshot>,
    pub image_barriers: Vec<ImageBarrierSnapshot>,
}

impl BarrierSnapshot {
    /// # Safety
    /// The three pointer/count pairs must be valid per `vkCmdPipelineBarrier`.
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn capture(
        src_stage_mask: vk::PipelineStageFlags,
        dst_stage_mask: vk::PipelineStageFlags,
        dependency_flags: vk::DependencyFlags,
        memory_barrier_count: u32,
        p_memory_barriers: *const vk::MemoryBarrier,
        buffer_barrier_count: u32,
        p_buffer_barriers: *const vk::BufferMemoryBarrier,
        image_barrier_count: u32,
        p_image_barriers: *const vk::ImageMemoryBarrier,
    ) -> Self {
        let memory_barriers = (0..memory_barrier_count as usize)
            .map(|i| {
                let b = &*p_memory_barriers.add(i);
                MemoryBarrierSnapshot {
                    src_access_mask: b.src_access_mask,
                    dst_access_mask: b.dst_access_mask,
                }
            })
            .collect();
        let buffer_barriers = (0..buffer_barrier_count as usize)
            .map(|i| {
                let b = &*p_buffer_barriers.add(i);
                BufferBarrierSnapshot {
                    src_access_mask: b.src_access_mask,
                    dst_access_mask: b.dst_access_mask,
                    src_queue_family_index: b.src_queue_family_index,
                    dst_queue_family_index: b.dst_queue_family_index,
                    buffer: b.buffer,
                    offset: b.offset,
                    size: b.size,
                }
            })
            .collect();
        let image_barriers = (0..image_barrier_count as usize)
            .map(|i| {
                let b = &*p_image_barriers.add(i);
                ImageBarrierSnapshot {
                    src_access_mask: b.src_access_mask,
                    dst_access_mask: b.dst_access_mask,
                    old_layout: b.old_layout,
                    new_layout: b.new_layout,
                    src_queue_family_index: b.src_queue_family_index,
                    dst_queue_family_index: b.dst_queue_family_index,
                    image: b.image,
                    subresource_range: b.subresource_range,
                }
            })
            .collect();

        Self {
            src_stage_mask,
            dst_stage_mask,
            dependency_flags,
            memory_barriers,
            buffer_barriers,
            image_barriers,
        }
    }
}
