//! Component-writer output.

use ash::vk;

use vkscoop_capture::buffer_file::BufferFileWriter;
use vkscoop_capture::formats::AmberFormat;

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("vkscoop_buffer_file_{}_{name}", std::process::id()))
}

#[test]
fn vec3_elements_are_padded_with_zeros() {
    let path = temp_path("vec3");
    let format = AmberFormat::new(vk::Format::R32G32B32_SFLOAT);

    // Two tightly packed vec3 elements of 12 bytes each.
    let data: Vec<u8> = (0u8..24).collect();
    let mut writer = match BufferFileWriter::create(&path) {
        Ok(writer) => writer,
        Err(err) => panic!("create failed: {err}"),
    };
    writer.write_element(&data, 0, &format).expect("first element");
    writer.write_element(&data, 12, &format).expect("second element");
    writer.finish().expect("finish");

    let written = std::fs::read(&path).expect("read back");
    assert_eq!(written.len(), 32);
    assert_eq!(&written[0..12], &data[0..12]);
    assert_eq!(&written[12..16], &[0, 0, 0, 0]);
    assert_eq!(&written[16..28], &data[12..24]);
    assert_eq!(&written[28..32], &[0, 0, 0, 0]);

    std::fs::remove_file(&path).ok();
}

#[test]
fn unpadded_elements_are_written_verbatim() {
    let path = temp_path("vec4");
    let format = AmberFormat::new(vk::Format::R8G8B8A8_UNORM);

    let data = [1u8, 2, 3, 4, 5, 6, 7, 8];
    let mut writer = BufferFileWriter::create(&path).expect("create");
    writer.write_element(&data, 4, &format).expect("element");
    writer.finish().expect("finish");

    assert_eq!(std::fs::read(&path).expect("read back"), vec![5, 6, 7, 8]);
    std::fs::remove_file(&path).ok();
}

#[test]
#[should_panic(expected = "overruns source")]
fn reading_outside_the_source_aborts() {
    let path = temp_path("overrun");
    let format = AmberFormat::new(vk::Format::R32G32B32A32_SFLOAT);

    let data = [0u8; 8];
    let mut writer = BufferFileWriter::create(&path).expect("create");
    let _ = writer.write_element(&data, 0, &format);
}
