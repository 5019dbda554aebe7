//! Format name mapping, parsing, widths and padding.

use ash::vk;

use vkscoop_capture::formats::{AmberFormat, ComponentName, ComponentType};

#[test]
fn vec3_format_pads_to_the_vec4_width() {
    let format = AmberFormat::new(vk::Format::R32G32B32_SFLOAT);
    assert_eq!(format.name(), "R32G32B32_SFLOAT");
    assert_eq!(format.data_width_bits(), 96);
    assert_eq!(format.padding_bytes(), 4);
    assert_eq!(format.total_width_bits(), 128);

    let vec4 = AmberFormat::new(vk::Format::R32G32B32A32_SFLOAT);
    assert_eq!(vec4.padding_bytes(), 0);
    assert_eq!(vec4.total_width_bits(), format.total_width_bits());
}

#[test]
fn vec3_padding_follows_the_component_width() {
    let format = AmberFormat::new(vk::Format::R16G16B16_UNORM);
    assert_eq!(format.data_width_bits(), 48);
    assert_eq!(format.padding_bytes(), 2);
    assert_eq!(format.total_width_bits(), 64);

    let r8 = AmberFormat::new(vk::Format::R8G8B8_SRGB);
    assert_eq!(r8.padding_bytes(), 1);
}

#[test]
fn packed_formats_never_pad() {
    let format = AmberFormat::new(vk::Format::B5G6R5_UNORM_PACK16);
    assert!(format.is_packed());
    assert_eq!(format.pack_size(), 16);
    assert_eq!(format.components().len(), 3);
    assert_eq!(format.padding_bytes(), 0);
    assert_eq!(format.data_width_bits(), 16);
}

#[test]
fn component_order_and_widths_follow_the_name() {
    let format = AmberFormat::new(vk::Format::A2B10G10R10_UINT_PACK32);
    let components = format.components();
    assert_eq!(components.len(), 4);

    assert_eq!(components[0].name, ComponentName::A);
    assert_eq!(components[0].width, 2);
    assert_eq!(components[1].name, ComponentName::B);
    assert_eq!(components[1].width, 10);
    assert_eq!(components[2].name, ComponentName::G);
    assert_eq!(components[3].name, ComponentName::R);
    for component in components {
        assert_eq!(component.kind, ComponentType::UInt);
    }
    assert_eq!(format.data_width_bits(), 32);
}

#[test]
fn depth_formats_parse_their_aspect_components() {
    let format = AmberFormat::new(vk::Format::X8_D24_UNORM_PACK32);
    let components = format.components();
    assert_eq!(components.len(), 2);
    assert_eq!(components[0].name, ComponentName::X);
    assert_eq!(components[0].width, 8);
    assert_eq!(components[1].name, ComponentName::D);
    assert_eq!(components[1].width, 24);
}

#[test]
fn stencil_chunks_are_typed_not_stored() {
    // The stencil aspect never reaches a vertex attribute; its chunk acts
    // as a type marker and contributes no component.
    let format = AmberFormat::new(vk::Format::D16_UNORM_S8_UINT);
    assert_eq!(format.components().len(), 1);
    assert_eq!(format.components()[0].name, ComponentName::D);
    assert_eq!(format.components()[0].width, 16);
}

#[test]
#[should_panic(expected = "not supported by amber")]
fn unsupported_formats_abort() {
    let _ = AmberFormat::new(vk::Format::BC1_RGB_UNORM_BLOCK);
}
