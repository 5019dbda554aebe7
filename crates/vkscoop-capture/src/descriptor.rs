//! Descriptor-set shadow state.
//!
//! Only buffer-class descriptors (uniform/storage, plain and dynamic) are
//! tracked; a set allocated from a layout declaring any other class with a
//! nonzero count is an unsupported input and aborts.

use std::sync::Arc;

use ash::vk;

use crate::deep_copy::{copy_array, DescriptorSetLayoutSnapshot};

fn is_buffer_class(descriptor_type: vk::DescriptorType) -> bool {
    matches!(
        descriptor_type,
        vk::DescriptorType::UNIFORM_BUFFER
            | vk::DescriptorType::STORAGE_BUFFER
            | vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC
            | vk::DescriptorType::STORAGE_BUFFER_DYNAMIC
    )
}

/// One tracked buffer descriptor. Defaults to a null binding, the state of
/// every element before the application writes it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub buffer: vk::Buffer,
    pub offset: vk::DeviceSize,
    pub range: vk::DeviceSize,
}

/// An owning copy of one `VkWriteDescriptorSet`.
pub struct DescriptorWriteSnapshot {
    pub dst_binding: u32,
    pub dst_array_element: u32,
    pub descriptor_type: vk::DescriptorType,
    pub buffer_info: Vec<BufferDescriptor>,
}

impl DescriptorWriteSnapshot {
    /// # Safety
    /// `write` must be a valid `VkWriteDescriptorSet`.
    pub unsafe fn capture(write: &vk::WriteDescriptorSet) -> Self {
        if !is_buffer_class(write.descriptor_type) {
            tracing::error!(
                descriptor_type = ?write.descriptor_type,
                "unsupported descriptor class in write"
            );
            panic!(
                "unsupported descriptor class in write: {:?}",
                write.descriptor_type
            );
        }
        let buffer_info = copy_array(write.p_buffer_info, write.descriptor_count as usize, 0)
            .into_iter()
            .map(|info: vk::DescriptorBufferInfo| BufferDescriptor {
                buffer: info.buffer,
                offset: info.offset,
                range: info.range,
            })
            .collect();
        Self {
            dst_binding: write.dst_binding,
            dst_array_element: write.dst_array_element,
            descriptor_type: write.descriptor_type,
            buffer_info,
        }
    }
}

/// The tracked contents of one descriptor set.
pub struct DescriptorSetState {
    layout: Arc<DescriptorSetLayoutSnapshot>,
    /// Per layout binding (by position), one slot per declared descriptor.
    buffer_bindings: Vec<Vec<BufferDescriptor>>,
}

impl DescriptorSetState {
    pub fn new(layout: Arc<DescriptorSetLayoutSnapshot>) -> Self {
        let buffer_bindings = layout
            .bindings
            .iter()
            .map(|binding| {
                if binding.descriptor_count > 0 && !is_buffer_class(binding.descriptor_type) {
                    tracing::error!(
                        binding = binding.binding,
                        descriptor_type = ?binding.descriptor_type,
                        "unsupported descriptor class in layout"
                    );
                    panic!(
                        "unsupported descriptor class in layout binding {}: {:?}",
                        binding.binding, binding.descriptor_type
                    );
                }
                vec![BufferDescriptor::default(); binding.descriptor_count as usize]
            })
            .collect();
        Self {
            layout,
            buffer_bindings,
        }
    }

    /// Apply one descriptor write.
    ///
    /// Consecutive descriptors that run past the destination binding's
    /// declared count continue at element 0 of the next binding with a
    /// nonzero count. Running past the last layout binding, or writing a
    /// type other than the destination binding's declared type, is a
    /// host-API violation and aborts.
    pub fn write(&mut self, write: &DescriptorWriteSnapshot) {
        let mut binding_index = self
            .layout
            .bindings
            .iter()
            .position(|b| b.binding == write.dst_binding)
            .unwrap_or_else(|| {
                panic!(
                    "descriptor write targets binding {} absent from the layout",
                    write.dst_binding
                )
            });
        let mut element = write.dst_array_element as usize;

        for descriptor in &write.buffer_info {
            while element >= self.buffer_bindings[binding_index].len() {
                binding_index += 1;
                element = 0;
                if binding_index >= self.buffer_bindings.len() {
                    tracing::error!(
                        dst_binding = write.dst_binding,
                        count = write.buffer_info.len(),
                        "descriptor write overflows the layout"
                    );
                    panic!("descriptor write overflows the layout");
                }
            }
            let declared = self.layout.bindings[binding_index].descriptor_type;
            if declared != write.descriptor_type {
                tracing::error!(
                    expected = ?declared,
                    got = ?write.descriptor_type,
                    "descriptor type mismatch"
                );
                panic!("descriptor type mismatch: layout declares {declared:?}, write carries {:?}", write.descriptor_type);
            }
            self.buffer_bindings[binding_index][element] = *descriptor;
            element += 1;
        }
    }

    /// The descriptor stored at (binding number, array element), if the
    /// binding exists and the element is in range.
    pub fn buffer_descriptor(&self, binding: u32, element: usize) -> Option<BufferDescriptor> {
        let position = self.layout.bindings.iter().position(|b| b.binding == binding)?;
        self.buffer_bindings[position].get(element).copied()
    }

    pub fn layout(&self) -> &Arc<DescriptorSetLayoutSnapshot> {
        &self.layout
    }
}
