//! Renderer2D recording and replay against the mock pass encoder.

mod common;

use common::{Harness, STANDARD_2D};
use glam::{UVec2, Vec2, Vec4};
use lumora_render::command::{Command, Command2DKind};
use lumora_render::renderer2d::VsConstants2D;
use lumora_render::{
    BatchConfig, Color, ConstantBuffer, ConstantBufferId, LineStyle, PassEncoder, PixelShader, PixelShaderId, RasterizerState,
    Rect, RectF, RenderError, RenderTexture, Renderer2D, Renderer2DConfig, ShaderStage, Texture, TextureId,
    VertexShader, VertexShaderId,
};
use lumora_test_utils::PassCall;

fn renderer(harness: &Harness) -> Renderer2D {
    Renderer2D::new(&harness.device, &harness.shaders, Renderer2DConfig::default())
}

fn rect(i: f32) -> RectF {
    RectF::new(10.0 * i, 10.0, 8.0, 8.0)
}

fn begin_pass_targets(calls: &[PassCall]) -> Vec<Option<usize>> {
    calls
        .iter()
        .filter_map(|call| match call {
            PassCall::BeginPass { color_id, .. } => Some(*color_id),
            _ => None,
        })
        .collect()
}

#[test]
fn test_shapes_with_same_state_share_one_draw() {
    let mut harness = Harness::new();
    let mut renderer = renderer(&harness);

    renderer.begin_frame();
    for i in 0..3 {
        renderer.add_rect(rect(i as f32), Color::WHITE);
    }
    renderer.flush(&mut harness.frame()).unwrap();

    assert_eq!(harness.pass.draw_indexed_calls(), vec![(0..18, 0)]);
    assert_eq!(harness.pass.count_passes(), 1);
    assert_eq!(harness.pass.count_pipeline_binds(), 1);

    let stats = renderer.stats();
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(stats.triangle_count, 6);
    assert_eq!(stats.render_passes, 1);
}

#[test]
fn test_state_change_splits_draws() {
    let mut harness = Harness::new();
    let mut renderer = renderer(&harness);

    renderer.add_rect(rect(0.0), Color::WHITE);
    renderer.set_color_mul(Color::RED);
    renderer.add_rect(rect(1.0), Color::WHITE);
    renderer.flush(&mut harness.frame()).unwrap();

    assert_eq!(harness.pass.draw_indexed_calls(), vec![(0..6, 0), (6..12, 0)]);

    let data = harness
        .shaders
        .last_constants(ShaderStage::Vertex, 0)
        .unwrap();
    let constants: VsConstants2D = bytemuck::pod_read_unaligned(data);
    assert_eq!(constants.color_mul, Color::RED.to_array());
}

#[test]
fn test_first_scene_pass_clears() {
    let mut harness = Harness::new();
    let config = Renderer2DConfig {
        clear_color: Some(Color::BLACK),
        ..Default::default()
    };
    let mut renderer = Renderer2D::new(&harness.device, &harness.shaders, config);

    renderer.add_rect(rect(0.0), Color::WHITE);
    renderer.flush(&mut harness.frame()).unwrap();

    assert_eq!(
        harness.pass.calls()[0],
        PassCall::BeginPass {
            color_id: Some(0),
            depth_id: None,
            clear: true
        }
    );
}

#[test]
fn test_render_target_switch_begins_new_passes() {
    let mut harness = Harness::new();
    harness
        .textures
        .add_target(TextureId(5), 5, UVec2::new(256, 128));
    let mut renderer = renderer(&harness);

    renderer.add_rect(rect(0.0), Color::WHITE);
    renderer.set_render_target(Some(RenderTexture::detached(TextureId(5))));
    renderer.add_rect(rect(1.0), Color::WHITE);
    renderer.set_render_target(None);
    renderer.add_rect(rect(2.0), Color::WHITE);
    renderer.flush(&mut harness.frame()).unwrap();

    let calls = harness.pass.calls();
    assert_eq!(begin_pass_targets(calls), vec![Some(0), Some(5), Some(0)]);
    assert_eq!(
        harness.pass.draw_indexed_calls(),
        vec![(0..6, 0), (6..12, 0), (12..18, 0)]
    );
    assert!(calls.contains(&PassCall::SetViewport {
        x: 0.0,
        y: 0.0,
        width: 256.0,
        height: 128.0
    }));
    assert_eq!(renderer.stats().render_passes, 3);
}

#[test]
fn test_render_target_unbinds_matching_texture() {
    let mut harness = Harness::new();
    harness
        .textures
        .add_target(TextureId(5), 5, UVec2::new(64, 64));
    let mut renderer = renderer(&harness);
    let texture = Texture::detached(TextureId(5));

    renderer.add_textured_region(&texture, rect(0.0), RectF::FULL_UV, Color::WHITE);
    assert_eq!(renderer.ps_texture(0), Some(TextureId(5)));

    renderer.set_render_target(Some(RenderTexture::detached(TextureId(5))));
    assert_eq!(renderer.ps_texture(0), Some(TextureId::INVALID));

    renderer.flush(&mut harness.frame()).unwrap();
    assert_eq!(
        harness.textures.bound(ShaderStage::Pixel, 0),
        vec![TextureId(5)]
    );
}

#[test]
fn test_missing_render_target_still_cleans_up() {
    let mut harness = Harness::new();
    let mut renderer = renderer(&harness);
    let setup_len = renderer.command_manager().commands().len();

    renderer.set_render_target(Some(RenderTexture::detached(TextureId(9))));
    renderer.add_rect(rect(0.0), Color::WHITE);
    renderer.set_custom_ps(Some(PixelShader::detached(PixelShaderId(77))));

    let result = renderer.flush(&mut harness.frame());
    assert_eq!(result, Err(RenderError::MissingRenderTarget(TextureId(9))));

    assert!(!harness.pass.is_pass_open());
    assert_eq!(renderer.command_manager().commands().len(), setup_len);
    assert!(renderer.custom_ps().is_none());
    assert_eq!(renderer.draw_count(), 1);
    // The target carries over into the next frame.
    assert_eq!(renderer.render_target(), Some(RenderTexture::detached(TextureId(9))));

    harness
        .textures
        .add_target(TextureId(9), 9, UVec2::new(32, 32));
    harness.pass.clear_calls();
    renderer.add_rect(rect(0.0), Color::WHITE);
    renderer.flush(&mut harness.frame()).unwrap();
    assert_eq!(harness.pass.count_draws(), 1);
    assert_eq!(begin_pass_targets(harness.pass.calls()), vec![Some(0), Some(9)]);
}

#[test]
fn test_batches_alternate_between_frames() {
    let mut harness = Harness::new();
    let mut renderer = renderer(&harness);

    let vertex_buffer_binds = |calls: &[PassCall]| -> Vec<Option<usize>> {
        calls
            .iter()
            .filter_map(|call| match call {
                PassCall::SetVertexBuffer { buffer_id, .. } => Some(*buffer_id),
                _ => None,
            })
            .collect()
    };

    let mut frames = Vec::new();
    for _ in 0..3 {
        harness.pass.clear_calls();
        renderer.begin_frame();
        renderer.add_rect(rect(0.0), Color::WHITE);
        renderer.flush(&mut harness.frame()).unwrap();
        frames.push((
            vertex_buffer_binds(harness.pass.calls()),
            harness.pass.draw_indexed_calls(),
        ));
    }

    // Two batches of two buffers each, created in order.
    assert_eq!(frames[0].0[0], Some(0));
    assert_eq!(frames[1].0[0], Some(2));
    assert_eq!(frames[2].0[0], Some(0));

    assert_eq!(frames[0].1, vec![(0..6, 0)]);
    assert_eq!(frames[1].1, vec![(0..6, 0)]);
    // The first batch's ring cursor moved past frame 0's upload.
    assert_eq!(frames[2].1, vec![(6..12, 4)]);
    assert_eq!(renderer.draw_count(), 3);
}

#[test]
fn test_overflow_mid_frame_starts_a_new_segment() {
    let mut harness = Harness::new();
    let config = Renderer2DConfig {
        batch: BatchConfig::default().with_gpu_capacity(8, 12),
        ..Default::default()
    };
    let mut renderer = Renderer2D::new(&harness.device, &harness.shaders, config);

    // Two quads fill one GPU buffer; the third opens segment 1.
    for i in 0..3 {
        renderer.add_rect(rect(i as f32), Color::WHITE);
    }
    let commands = renderer.command_manager().commands();
    assert_eq!(
        &commands[commands.len() - 2..],
        &[
            Command::new(Command2DKind::Draw, 0),
            Command::new(Command2DKind::UpdateBuffers, 1),
        ]
    );

    renderer.flush(&mut harness.frame()).unwrap();

    // Segment 1 wraps the ring and is drawn from its own start.
    assert_eq!(harness.pass.draw_indexed_calls(), vec![(0..12, 0), (0..6, 0)]);
    assert_eq!(harness.device.count_buffer_writes(), 4);
    assert_eq!(renderer.stats().draw_calls, 2);
}

#[test]
fn test_missing_pipeline_skips_only_that_draw() {
    let mut harness = Harness::new();
    harness.shaders.missing_ps.push(STANDARD_2D.shape_ps);
    let mut renderer = renderer(&harness);
    let texture = Texture::detached(TextureId(1));

    renderer.add_rect(rect(0.0), Color::WHITE);
    renderer.add_textured_region(&texture, rect(1.0), RectF::FULL_UV, Color::WHITE);
    renderer.flush(&mut harness.frame()).unwrap();

    assert_eq!(harness.pass.draw_indexed_calls(), vec![(6..12, 0)]);
    let stats = renderer.stats();
    assert_eq!(stats.skipped_draws, 1);
    assert_eq!(stats.draw_calls, 1);
}

#[test]
fn test_scissor_follows_rasterizer_state() {
    let mut harness = Harness::new();
    let mut renderer = renderer(&harness);

    renderer.set_scissor_rect(Rect::new(10, 20, 100, 50));
    renderer.add_rect(rect(0.0), Color::WHITE);
    renderer.set_rasterizer_state(RasterizerState::SCISSOR_2D);
    renderer.add_rect(rect(1.0), Color::WHITE);
    renderer.flush(&mut harness.frame()).unwrap();

    let scissors: Vec<_> = harness
        .pass
        .calls()
        .iter()
        .filter(|call| matches!(call, PassCall::SetScissorRect { .. }))
        .cloned()
        .collect();
    assert_eq!(
        scissors,
        vec![
            PassCall::SetScissorRect {
                x: 0,
                y: 0,
                width: 800,
                height: 600
            },
            PassCall::SetScissorRect {
                x: 10,
                y: 20,
                width: 100,
                height: 50
            },
        ]
    );
}

#[test]
fn test_user_constant_buffer_is_uploaded() {
    let mut harness = Harness::new();
    let mut renderer = renderer(&harness);
    let buffer = ConstantBuffer::detached(ConstantBufferId(3));

    renderer.set_constant_buffer(ShaderStage::Pixel, 1, &buffer, &[Vec4::ONE]);
    renderer.add_rect(rect(0.0), Color::WHITE);
    renderer.flush(&mut harness.frame()).unwrap();

    let (stage, slot, id, data) = &harness.shaders.buffers[0];
    assert_eq!((*stage, *slot, *id), (ShaderStage::Pixel, 1, ConstantBufferId(3)));
    assert_eq!(data.len(), 16);
}

#[test]
fn test_null_vertices_use_custom_vertex_shader() {
    let mut harness = Harness::new();
    let mut renderer = renderer(&harness);

    renderer.set_custom_vs(Some(VertexShader::detached(VertexShaderId(42))));
    renderer.add_null_vertices(3);
    renderer.flush(&mut harness.frame()).unwrap();

    assert!(harness.pass.calls().contains(&PassCall::Draw {
        vertices: 0..3,
        instances: 0..1
    }));
    assert_eq!(harness.shaders.keys[0].vs, VertexShaderId(42));
    assert!(renderer.custom_vs().is_none());
}

#[test]
fn test_dotted_line_uses_dot_shader() {
    let mut harness = Harness::new();
    let mut renderer = renderer(&harness);

    renderer.add_line(
        LineStyle::ROUND_DOT,
        Vec2::ZERO,
        Vec2::new(100.0, 0.0),
        4.0,
        [Color::WHITE; 2],
    );
    renderer.flush(&mut harness.frame()).unwrap();

    assert_eq!(harness.shaders.keys[0].ps, STANDARD_2D.round_dot_ps);
    assert_eq!(harness.pass.count_draws(), 1);
}

#[test]
fn test_empty_frame_only_opens_scene_pass() {
    let mut harness = Harness::new();
    let mut renderer = renderer(&harness);

    renderer.flush(&mut harness.frame()).unwrap();

    assert_eq!(harness.pass.count_passes(), 1);
    assert_eq!(harness.pass.count_draws(), 0);
    assert_eq!(harness.pass.calls().last(), Some(&PassCall::EndPass));
}
