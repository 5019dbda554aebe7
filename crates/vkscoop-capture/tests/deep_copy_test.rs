//! Snapshot ownership and array-copy semantics.

use ash::vk;
use ash::vk::Handle;

use vkscoop_capture::deep_copy::{copy_array, RenderPassBeginSnapshot, SpecializationSnapshot};
use vkscoop_capture::tables::ShaderModuleState;

#[test]
fn copy_array_of_null_is_empty() {
    let copied = unsafe { copy_array::<u32>(std::ptr::null(), 16, 0) };
    assert!(copied.is_empty());
}

#[test]
fn copy_array_copies_from_the_offset() {
    let source = [10u32, 11, 12, 13, 14];
    let copied = unsafe { copy_array(source.as_ptr(), source.len(), 2) };
    assert_eq!(copied, vec![12, 13, 14]);

    let exhausted = unsafe { copy_array(source.as_ptr(), 2, 2) };
    assert!(exhausted.is_empty());
}

#[test]
fn render_pass_begin_snapshot_owns_its_clear_values() {
    let clear_values = [
        vk::ClearValue {
            color: vk::ClearColorValue {
                float32: [0.0, 0.5, 1.0, 1.0],
            },
        },
        vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: 1.0,
                stencil: 0,
            },
        },
    ];
    let info = vk::RenderPassBeginInfo::default()
        .render_pass(vk::RenderPass::from_raw(0x70))
        .framebuffer(vk::Framebuffer::from_raw(0x80))
        .render_area(vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: vk::Extent2D {
                width: 256,
                height: 256,
            },
        })
        .clear_values(&clear_values);

    let snapshot = unsafe { RenderPassBeginSnapshot::capture(&info) };
    // The source array can go away; the snapshot owns a copy.
    drop(clear_values);

    assert_eq!(snapshot.render_pass.as_raw(), 0x70);
    assert_eq!(snapshot.framebuffer.as_raw(), 0x80);
    assert_eq!(snapshot.clear_values.len(), 2);
    unsafe {
        assert_eq!(snapshot.clear_values[0].color.float32[1], 0.5);
        assert_eq!(snapshot.clear_values[1].depth_stencil.depth, 1.0);
    }
}

#[test]
fn render_pass_begin_snapshot_without_clear_values_is_empty() {
    let info = vk::RenderPassBeginInfo::default();
    let snapshot = unsafe { RenderPassBeginSnapshot::capture(&info) };
    assert!(snapshot.clear_values.is_empty());
}

#[test]
fn specialization_snapshot_copies_entries_and_data() {
    let entries = [vk::SpecializationMapEntry {
        constant_id: 0,
        offset: 0,
        size: 4,
    }];
    let data = 42u32.to_le_bytes();
    let info = vk::SpecializationInfo::default()
        .map_entries(&entries)
        .data(&data);

    let snapshot = unsafe { SpecializationSnapshot::capture(&info) };
    assert_eq!(snapshot.map_entries.len(), 1);
    assert_eq!(snapshot.map_entries[0].size, 4);
    assert_eq!(snapshot.data, data.to_vec());
}

#[test]
fn shader_module_stays_in_use_until_unreferenced() {
    let state = ShaderModuleState::new(vec![0x0723_0203, 0x0001_0000]);
    let pipeline = vk::Pipeline::from_raw(0x90);

    state.add_pipeline(pipeline);
    state.set_destroyed();
    // Destroyed but still referenced: not reclaimable, still in use.
    assert!(state.in_use());
    assert!(!state.reclaimable());

    state.remove_pipeline(pipeline);
    assert!(!state.in_use());
    assert!(state.reclaimable());
}

#[test]
fn unreferenced_shader_module_reclaims_on_destroy() {
    let state = ShaderModuleState::new(vec![0x0723_0203, 0x0001_0000]);
    assert!(!state.in_use());
    assert!(!state.reclaimable());

    state.set_destroyed();
    assert!(!state.in_use());
    assert!(state.reclaimable());
    assert_eq!(state.version_word(), Some(0x0001_0000));
}
