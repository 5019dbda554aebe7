//! Device-object state tables.
//!
//! Each `VkDevice` gets one [`DeviceTables`]. Values are stored behind
//! `Arc`, so a lookup hands out a stable shared reference with no guard
//! lifetime, and an object evicted from its table stays alive for anything
//! still holding it.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ash::vk;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::deep_copy::{
    BufferCreateSnapshot, DescriptorSetLayoutSnapshot, GraphicsPipelineCreateSnapshot,
    PipelineLayoutSnapshot,
};
use crate::descriptor::DescriptorSetState;
use crate::shadow::ShadowStore;

/// A concurrent handle-keyed table of shared state objects.
pub struct StateTable<K: Eq + Hash, V> {
    map: DashMap<K, Arc<V>>,
}

impl<K: Eq + Hash, V> StateTable<K, V> {
    pub fn new() -> Self {
        Self {
            map: DashMap::new(),
        }
    }

    /// Insert or overwrite. Returns true when the key was not present;
    /// overwriting is legal because Vulkan recycles handle values.
    pub fn put(&self, key: K, value: V) -> bool {
        self.map.insert(key, Arc::new(value)).is_none()
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.map.get(key).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, key: &K) -> Option<Arc<V>> {
        self.map.remove(key).map(|(_, value)| value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<K: Eq + Hash, V> Default for StateTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracked state of one shader module.
///
/// The application may destroy a module while pipelines created from it
/// still exist. Pipelines hold an `Arc` of this state, so the code stays
/// alive regardless; the destroyed flag and the referencing set only decide
/// when the handle's table entry can be evicted.
pub struct ShaderModuleState {
    code: Vec<u32>,
    destroyed: AtomicBool,
    pipelines: Mutex<HashSet<vk::Pipeline>>,
}

impl ShaderModuleState {
    pub fn new(code: Vec<u32>) -> Self {
        Self {
            code,
            destroyed: AtomicBool::new(false),
            pipelines: Mutex::new(HashSet::new()),
        }
    }

    pub fn code(&self) -> &[u32] {
        &self.code
    }

    /// The version word at index 1 of the SPIR-V binary, if present.
    pub fn version_word(&self) -> Option<u32> {
        self.code.get(1).copied()
    }

    pub fn add_pipeline(&self, pipeline: vk::Pipeline) {
        self.pipelines.lock().insert(pipeline);
    }

    pub fn remove_pipeline(&self, pipeline: vk::Pipeline) {
        self.pipelines.lock().remove(&pipeline);
    }

    pub fn set_destroyed(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }

    /// True while any pipeline still references this module.
    pub fn in_use(&self) -> bool {
        !self.pipelines.lock().is_empty()
    }

    /// True once destruction was requested and no pipeline references
    /// remain; only then may the table entry go.
    pub fn reclaimable(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst) && !self.in_use()
    }
}

/// Tracked state of one graphics pipeline: its create-info snapshot plus
/// shared ownership of the shader modules it was built from.
pub struct GraphicsPipelineState {
    pub create_info: GraphicsPipelineCreateSnapshot,
    shader_modules: std::collections::HashMap<vk::ShaderModule, Arc<ShaderModuleState>>,
}

impl GraphicsPipelineState {
    pub fn new(create_info: GraphicsPipelineCreateSnapshot) -> Self {
        Self {
            create_info,
            shader_modules: std::collections::HashMap::new(),
        }
    }

    pub fn add_shader_module(&mut self, handle: vk::ShaderModule, state: Arc<ShaderModuleState>) {
        self.shader_modules.insert(handle, state);
    }

    pub fn shader_module(&self, handle: vk::ShaderModule) -> Option<&Arc<ShaderModuleState>> {
        self.shader_modules.get(&handle)
    }

    pub fn shader_modules(
        &self,
    ) -> impl Iterator<Item = (vk::ShaderModule, &Arc<ShaderModuleState>)> {
        self.shader_modules.iter().map(|(handle, state)| (*handle, state))
    }
}

/// All tracked state of one device.
#[derive(Default)]
pub struct DeviceTables {
    pub command_buffers: ShadowStore,
    pub shader_modules: StateTable<vk::ShaderModule, ShaderModuleState>,
    pub graphics_pipelines: StateTable<vk::Pipeline, GraphicsPipelineState>,
    pub pipeline_layouts: StateTable<vk::PipelineLayout, PipelineLayoutSnapshot>,
    pub descriptor_set_layouts: StateTable<vk::DescriptorSetLayout, DescriptorSetLayoutSnapshot>,
    pub descriptor_sets: StateTable<vk::DescriptorSet, Mutex<DescriptorSetState>>,
    pub buffers: StateTable<vk::Buffer, BufferCreateSnapshot>,
}

impl DeviceTables {
    pub fn new() -> Self {
        Self::default()
    }
}
