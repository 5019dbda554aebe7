//! Per-command-buffer shadow recordings.

use ash::vk;
use dashmap::DashMap;

use crate::command::Command;

/// The shadow of one command buffer's recorded contents.
///
/// Vulkan lets an application re-record a command buffer after submitting
/// it; the first record after a submit therefore starts a fresh recording.
#[derive(Default)]
pub struct CommandBufferShadow {
    commands: Vec<Command>,
    submitted: bool,
    contains_draw_calls: bool,
}

impl CommandBufferShadow {
    pub fn record(&mut self, command: Command) {
        if self.submitted {
            self.commands.clear();
            self.submitted = false;
            self.contains_draw_calls = false;
        }
        if command.is_draw_call() {
            self.contains_draw_calls = true;
        }
        self.commands.push(command);
    }

    pub fn mark_submitted(&mut self) {
        self.submitted = true;
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn contains_draw_calls(&self) -> bool {
        self.contains_draw_calls
    }
}

/// Shadow recordings for every command buffer of a device.
///
/// Entries are created lazily on first record; a command buffer that was
/// never recorded into has no entry, and submitting it is a no-op. The
/// sharded lock protects table structure only.
#[derive(Default)]
pub struct ShadowStore {
    map: DashMap<vk::CommandBuffer, CommandBufferShadow>,
}

impl ShadowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, command_buffer: vk::CommandBuffer, command: Command) {
        self.map.entry(command_buffer).or_default().record(command);
    }

    /// Mark a command buffer submitted and, when its shadow contains draw
    /// calls, hand the recorded sequence to `replay`. Returns false when
    /// the command buffer was never recorded into.
    ///
    /// The shard lock only covers taking the sequence out and putting it
    /// back; `replay` blocks on disassembly, file I/O and the read-back
    /// fence, and holding the lock across it would stall recording into
    /// every other command buffer on the same shard.
    pub fn submit<F>(&self, command_buffer: vk::CommandBuffer, replay: F) -> bool
    where
        F: FnOnce(&[Command]),
    {
        let commands = match self.map.get_mut(&command_buffer) {
            Some(mut shadow) => {
                shadow.mark_submitted();
                if !shadow.contains_draw_calls() {
                    return true;
                }
                std::mem::take(&mut shadow.commands)
            }
            None => return false,
        };

        replay(&commands);

        // The sequence persists across submissions until the application
        // re-records. A record that raced the replay already started a
        // fresh recording; leave it alone.
        if let Some(mut shadow) = self.map.get_mut(&command_buffer) {
            if shadow.submitted && shadow.commands.is_empty() {
                shadow.commands = commands;
            }
        }
        true
    }

    /// Inspect a shadow without submitting it.
    pub fn with<F, R>(&self, command_buffer: vk::CommandBuffer, f: F) -> Option<R>
    where
        F: FnOnce(&CommandBufferShadow) -> R,
    {
        self.map.get(&command_buffer).map(|shadow| f(&shadow))
    }

    pub fn remove(&self, command_buffer: vk::CommandBuffer) {
        self.map.remove(&command_buffer);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
