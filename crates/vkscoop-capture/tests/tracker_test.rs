//! Draw-call reconstruction: windowing, ordinal assignment, output files.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use ash::vk;
use ash::vk::Handle;

use vkscoop_core::{CaptureSettings, ScoopError};

use vkscoop_capture::command::Command;
use vkscoop_capture::deep_copy::{
    BufferCreateSnapshot, GraphicsPipelineCreateSnapshot, RenderPassBeginSnapshot,
    ShaderStageSnapshot, VertexInputSnapshot,
};
use vkscoop_capture::disasm::WordListDisassembler;
use vkscoop_capture::shadow::ShadowStore;
use vkscoop_capture::tables::{DeviceTables, GraphicsPipelineState, ShaderModuleState};
use vkscoop_capture::tracker::{BufferReadback, CaptureContext, DrawCallTracker};

const PIPELINE: u64 = 0x100;
const VERTEX_MODULE: u64 = 0x101;
const FRAGMENT_MODULE: u64 = 0x102;
const VERTEX_BUFFER: u64 = 0x200;
const INDEX_BUFFER: u64 = 0x201;
const QUEUE: u64 = 0x300;

/// Hands out canned bytes per buffer handle.
struct CannedReadback {
    buffers: HashMap<u64, Vec<u8>>,
}

impl BufferReadback for CannedReadback {
    fn read_buffer(
        &self,
        _queue: vk::Queue,
        buffer: vk::Buffer,
        size: vk::DeviceSize,
    ) -> Result<Vec<u8>, ScoopError> {
        match self.buffers.get(&buffer.as_raw()) {
            Some(data) => {
                assert_eq!(data.len(), size as usize, "read size must match create info");
                Ok(data.clone())
            }
            None => Err(ScoopError::Readback(format!(
                "no canned data for buffer {:#x}",
                buffer.as_raw()
            ))),
        }
    }
}

fn spirv(words: &[u32]) -> Vec<u32> {
    let mut code = vec![0x0723_0203, 0x0001_0000];
    code.extend_from_slice(words);
    code
}

/// One graphics pipeline with a single vec4 attribute on binding 0.
fn make_tables(vertex_buffer_size: u64, index_buffer_size: u64) -> DeviceTables {
    let tables = DeviceTables::new();

    let vertex_module = Arc::new(ShaderModuleState::new(spirv(&[1, 2, 3])));
    let fragment_module = Arc::new(ShaderModuleState::new(spirv(&[4, 5, 6])));

    let create_info = GraphicsPipelineCreateSnapshot {
        stages: vec![
            ShaderStageSnapshot {
                stage: vk::ShaderStageFlags::VERTEX,
                module: vk::ShaderModule::from_raw(VERTEX_MODULE),
                entry_point: "main".to_string(),
                specialization: None,
            },
            ShaderStageSnapshot {
                stage: vk::ShaderStageFlags::FRAGMENT,
                module: vk::ShaderModule::from_raw(FRAGMENT_MODULE),
                entry_point: "main".to_string(),
                specialization: None,
            },
        ],
        vertex_input: VertexInputSnapshot {
            bindings: vec![vk::VertexInputBindingDescription {
                binding: 0,
                stride: 16,
                input_rate: vk::VertexInputRate::VERTEX,
            }],
            attributes: vec![vk::VertexInputAttributeDescription {
                location: 0,
                binding: 0,
                format: vk::Format::R32G32B32A32_SFLOAT,
                offset: 0,
            }],
        },
        topology: vk::PrimitiveTopology::TRIANGLE_LIST,
        primitive_restart: false,
        layout: vk::PipelineLayout::null(),
        render_pass: vk::RenderPass::from_raw(0x70),
        subpass: 0,
    };

    let mut pipeline_state = GraphicsPipelineState::new(create_info);
    pipeline_state.add_shader_module(vk::ShaderModule::from_raw(VERTEX_MODULE), vertex_module);
    pipeline_state.add_shader_module(vk::ShaderModule::from_raw(FRAGMENT_MODULE), fragment_module);

    tables
        .graphics_pipelines
        .put(vk::Pipeline::from_raw(PIPELINE), pipeline_state);

    tables.buffers.put(
        vk::Buffer::from_raw(VERTEX_BUFFER),
        BufferCreateSnapshot {
            size: vertex_buffer_size,
            usage: vk::BufferUsageFlags::VERTEX_BUFFER,
            sharing_mode: vk::SharingMode::EXCLUSIVE,
            queue_family_indices: Vec::new(),
        },
    );
    tables.buffers.put(
        vk::Buffer::from_raw(INDEX_BUFFER),
        BufferCreateSnapshot {
            size: index_buffer_size,
            usage: vk::BufferUsageFlags::INDEX_BUFFER,
            sharing_mode: vk::SharingMode::EXCLUSIVE,
            queue_family_indices: Vec::new(),
        },
    );

    tables
}

fn setup_commands() -> Vec<Command> {
    vec![
        Command::BeginRenderPass {
            begin: RenderPassBeginSnapshot {
                render_pass: vk::RenderPass::from_raw(0x70),
                framebuffer: vk::Framebuffer::from_raw(0x80),
                render_area: vk::Rect2D::default(),
                clear_values: Vec::new(),
            },
            contents: vk::SubpassContents::INLINE,
        },
        Command::BindPipeline {
            bind_point: vk::PipelineBindPoint::GRAPHICS,
            pipeline: vk::Pipeline::from_raw(PIPELINE),
        },
        Command::BindVertexBuffers {
            first_binding: 0,
            buffers: vec![vk::Buffer::from_raw(VERTEX_BUFFER)],
            offsets: vec![0],
        },
    ]
}

fn draw(vertex_count: u32) -> Command {
    Command::Draw {
        vertex_count,
        instance_count: 1,
        first_vertex: 0,
        first_instance: 0,
    }
}

fn output_prefix(test: &str) -> String {
    let dir: PathBuf = std::env::temp_dir().join(format!("vkscoop_{test}_{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create output dir");
    dir.join("capture").to_string_lossy().into_owned()
}

fn readback_with_vertices(vertex_count: usize) -> CannedReadback {
    let mut buffers = HashMap::new();
    buffers.insert(VERTEX_BUFFER, vec![0u8; vertex_count * 16]);
    CannedReadback { buffers }
}

#[test]
fn scenario_one_draw_one_scene_file() {
    let prefix = output_prefix("scenario");
    let settings = CaptureSettings::new(0, 1, prefix.clone());
    let counter = AtomicU64::new(0);
    let tables = make_tables(3 * 16, 0);
    let readback = readback_with_vertices(3);
    let disassembler = WordListDisassembler;

    let store = ShadowStore::new();
    let command_buffer = vk::CommandBuffer::from_raw(0x1000);
    for command in setup_commands() {
        store.record(command_buffer, command);
    }
    store.record(command_buffer, draw(3));

    let replayed = store.submit(command_buffer, |commands| {
        let ctx = CaptureContext {
            settings: &settings,
            draw_counter: &counter,
            tables: &tables,
            readback: &readback,
            disassembler: &disassembler,
        };
        let mut tracker = DrawCallTracker::new(ctx, vk::Queue::from_raw(QUEUE));
        if let Err(err) = tracker.replay(commands) {
            panic!("replay failed: {err}");
        }
    });
    assert!(replayed);

    let scene_path = format!("{prefix}_0.amber");
    let text = std::fs::read_to_string(&scene_path)
        .unwrap_or_else(|err| panic!("missing scene file {scene_path}: {err}"));

    assert!(text.starts_with("#!amber\n"));
    assert!(text.contains("SHADER vertex vertex_shader SPIRV-ASM"));
    assert!(text.contains("SHADER fragment fragment_shader SPIRV-ASM"));
    assert!(text.contains("PIPELINE graphics pipeline"));
    assert!(text.contains("RUN pipeline DRAW_ARRAY AS TRIANGLE_LIST START_IDX 0 COUNT 3"));
    assert!(!text.contains("INDEXED"));
    assert!(!text.contains("INSTANCE_COUNT"));

    // One padded vec4 stream: 3 vertices of 16 bytes, no padding.
    let attr = std::fs::read(format!("{prefix}_0_attr0.bin")).expect("attribute side-car");
    assert_eq!(attr.len(), 48);
}

#[test]
fn window_filters_draws_outside_start_and_count() {
    let prefix = output_prefix("window");
    let settings = CaptureSettings::new(5, 3, prefix.clone());
    let counter = AtomicU64::new(0);
    let tables = make_tables(16 * 16, 0);
    let readback = readback_with_vertices(16);
    let disassembler = WordListDisassembler;

    let mut commands = setup_commands();
    for _ in 0..10 {
        commands.push(draw(3));
    }

    let ctx = CaptureContext {
        settings: &settings,
        draw_counter: &counter,
        tables: &tables,
        readback: &readback,
        disassembler: &disassembler,
    };
    let mut tracker = DrawCallTracker::new(ctx, vk::Queue::from_raw(QUEUE));
    tracker.replay(&commands).expect("replay");

    // Every draw consumed an ordinal, window or not.
    assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 10);

    for ordinal in 0..10 {
        let exists = std::fs::metadata(format!("{prefix}_{ordinal}.amber")).is_ok();
        let expected = (5..=8).contains(&ordinal);
        assert_eq!(exists, expected, "ordinal {ordinal}");
    }
}

#[test]
fn concurrent_replays_assign_unique_dense_ordinals() {
    const THREADS: u64 = 4;
    const DRAWS_PER_THREAD: u64 = 8;

    let prefix = output_prefix("concurrent");
    let settings = Arc::new(CaptureSettings::new(
        0,
        THREADS * DRAWS_PER_THREAD,
        prefix.clone(),
    ));
    let counter = Arc::new(AtomicU64::new(0));
    let tables = Arc::new(make_tables(3 * 16, 0));

    let mut handles = Vec::new();
    for _ in 0..THREADS {
        let settings = settings.clone();
        let counter = counter.clone();
        let tables = tables.clone();
        handles.push(std::thread::spawn(move || {
            let readback = readback_with_vertices(3);
            let disassembler = WordListDisassembler;
            let mut commands = setup_commands();
            for _ in 0..DRAWS_PER_THREAD {
                commands.push(draw(3));
            }
            let ctx = CaptureContext {
                settings: &settings,
                draw_counter: &counter,
                tables: &tables,
                readback: &readback,
                disassembler: &disassembler,
            };
            let mut tracker = DrawCallTracker::new(ctx, vk::Queue::from_raw(QUEUE));
            tracker.replay(&commands).expect("replay");
        }));
    }
    for handle in handles {
        handle.join().expect("worker thread");
    }

    let total = THREADS * DRAWS_PER_THREAD;
    assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), total);
    // Dense: every ordinal in [0, total) produced exactly one file.
    for ordinal in 0..total {
        assert!(
            std::fs::metadata(format!("{prefix}_{ordinal}.amber")).is_ok(),
            "missing scene for ordinal {ordinal}"
        );
    }
    assert!(std::fs::metadata(format!("{prefix}_{total}.amber")).is_err());
}

#[test]
fn indexed_draw_emits_index_side_car_and_spans_used_vertices() {
    let prefix = output_prefix("indexed");
    let settings = CaptureSettings::new(0, 1, prefix.clone());
    let counter = AtomicU64::new(0);

    // Indices 0, 2, 1 as u16: three indices, max 2, so three vertices.
    let index_data: Vec<u8> = [0u16, 2, 1].iter().flat_map(|i| i.to_le_bytes()).collect();
    let vertex_data = vec![0u8; 3 * 16];
    let tables = make_tables(vertex_data.len() as u64, index_data.len() as u64);

    let mut buffers = HashMap::new();
    buffers.insert(VERTEX_BUFFER, vertex_data);
    buffers.insert(INDEX_BUFFER, index_data.clone());
    let readback = CannedReadback { buffers };
    let disassembler = WordListDisassembler;

    let mut commands = setup_commands();
    commands.push(Command::BindIndexBuffer {
        buffer: vk::Buffer::from_raw(INDEX_BUFFER),
        offset: 0,
        index_type: vk::IndexType::UINT16,
    });
    commands.push(Command::DrawIndexed {
        index_count: 3,
        instance_count: 1,
        first_index: 0,
        vertex_offset: 0,
        first_instance: 0,
    });

    let ctx = CaptureContext {
        settings: &settings,
        draw_counter: &counter,
        tables: &tables,
        readback: &readback,
        disassembler: &disassembler,
    };
    let mut tracker = DrawCallTracker::new(ctx, vk::Queue::from_raw(QUEUE));
    tracker.replay(&commands).expect("replay");

    let text = std::fs::read_to_string(format!("{prefix}_0.amber")).expect("scene file");
    assert!(text.contains("RUN pipeline DRAW_ARRAY AS TRIANGLE_LIST INDEXED START_IDX 0 COUNT 3"));

    let indices = std::fs::read(format!("{prefix}_0_indices.bin")).expect("index side-car");
    assert_eq!(indices, index_data);

    // max index 2 -> vertices 0..=2 -> 3 elements of 16 bytes.
    let attr = std::fs::read(format!("{prefix}_0_attr0.bin")).expect("attribute side-car");
    assert_eq!(attr.len(), 48);
}
