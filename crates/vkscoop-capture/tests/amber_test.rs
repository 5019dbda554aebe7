//! Amber scene rendering.

use ash::vk;

use vkscoop_capture::amber::{topology_name, AmberScene, RunCommand};

fn scene(run: RunCommand) -> AmberScene {
    AmberScene {
        vertex_shader: "; vertex\n".to_string(),
        fragment_shader: "; fragment\n".to_string(),
        topology: topology_name(vk::PrimitiveTopology::TRIANGLE_LIST),
        run,
    }
}

#[test]
fn single_instance_draw_renders_the_minimal_run_line() {
    let scene = scene(RunCommand::Arrays {
        first_vertex: 0,
        vertex_count: 3,
        first_instance: 0,
        instance_count: 1,
    });
    assert_eq!(
        scene.run_line(),
        "RUN pipeline DRAW_ARRAY AS TRIANGLE_LIST START_IDX 0 COUNT 3"
    );
}

#[test]
fn instanced_draw_carries_the_instance_clause() {
    let scene = scene(RunCommand::Arrays {
        first_vertex: 6,
        vertex_count: 12,
        first_instance: 2,
        instance_count: 4,
    });
    assert_eq!(
        scene.run_line(),
        "RUN pipeline DRAW_ARRAY AS TRIANGLE_LIST START_IDX 6 COUNT 12 START_INSTANCE 2 INSTANCE_COUNT 4"
    );
}

#[test]
fn indexed_draw_carries_the_indexed_clause() {
    let scene = scene(RunCommand::Indexed {
        first_index: 3,
        index_count: 9,
        first_instance: 0,
        instance_count: 1,
    });
    assert_eq!(
        scene.run_line(),
        "RUN pipeline DRAW_ARRAY AS TRIANGLE_LIST INDEXED START_IDX 3 COUNT 9"
    );
}

#[test]
fn rendered_scene_has_the_expected_sections_in_order() {
    let text = scene(RunCommand::Arrays {
        first_vertex: 0,
        vertex_count: 3,
        first_instance: 0,
        instance_count: 1,
    })
    .render();

    assert!(text.starts_with("#!amber\n"));
    let vs = match text.find("SHADER vertex vertex_shader SPIRV-ASM\n; vertex\nEND\n") {
        Some(pos) => pos,
        None => panic!("vertex shader section missing:\n{text}"),
    };
    let fs = match text.find("SHADER fragment fragment_shader SPIRV-ASM\n; fragment\nEND\n") {
        Some(pos) => pos,
        None => panic!("fragment shader section missing:\n{text}"),
    };
    let pipeline = match text
        .find("PIPELINE graphics pipeline\n  ATTACH vertex_shader\n  ATTACH fragment_shader\nEND\n")
    {
        Some(pos) => pos,
        None => panic!("pipeline section missing:\n{text}"),
    };
    let run = match text.find("RUN pipeline DRAW_ARRAY AS TRIANGLE_LIST") {
        Some(pos) => pos,
        None => panic!("run command missing:\n{text}"),
    };
    assert!(vs < fs && fs < pipeline && pipeline < run);
    assert!(text.ends_with('\n'));
}

#[test]
fn adjacency_topologies_map_to_amber_names() {
    assert_eq!(
        topology_name(vk::PrimitiveTopology::TRIANGLE_STRIP_WITH_ADJACENCY),
        "TRIANGLE_STRIP_WITH_ADJACENCY"
    );
    assert_eq!(topology_name(vk::PrimitiveTopology::PATCH_LIST), "PATCH_LIST");
}
