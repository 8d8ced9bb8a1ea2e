//! Coalescing, ordering and reset behaviour of the command managers.

use glam::{Vec3, Vec4};
use lumora_render::command::{
    Command, Command2DKind, Command3DKind, CommandManager2D, CommandManager3D, DrawCommand2D, PhongMaterial,
};
use lumora_render::{
    BlendMode, Color, ConstantBuffer, ConstantBufferId, Mesh, MeshId, ShaderStage, Texture, TextureId,
};

fn new_kinds_2d(manager: &CommandManager2D, from: usize) -> Vec<Command2DKind> {
    manager.commands()[from..].iter().map(|c| c.kind).collect()
}

#[test]
fn test_repeated_pushes_coalesce() {
    let mut manager = CommandManager2D::new();
    let setup = manager.commands().len();

    for _ in 0..10 {
        manager.push_blend_state(BlendMode::Additive);
    }
    manager.flush();

    assert_eq!(new_kinds_2d(&manager, setup), vec![Command2DKind::BlendState]);
    assert_eq!(manager.blend_states().len(), 2);
    assert_eq!(*manager.blend_states().last(), BlendMode::Additive);
}

#[test]
fn test_push_back_to_committed_value_cancels() {
    let mut manager = CommandManager2D::new();
    let setup = manager.commands().len();

    manager.push_color_add(Color::RED);
    manager.push_color_add(Color::BLUE);
    manager.push_color_add(Color::TRANSPARENT);
    assert!(!manager.has_state_change());

    manager.flush();
    assert_eq!(manager.commands().len(), setup);
    assert_eq!(manager.color_add().len(), 1);
}

#[test]
fn test_draws_follow_their_state() {
    let mut manager = CommandManager2D::new();
    let setup = manager.commands().len();

    manager.push_color_mul(Color::RED);
    manager.push_draw(6);
    manager.push_blend_state(BlendMode::Additive);
    manager.push_ps_texture(0, Some(&Texture::detached(TextureId(1))));
    manager.push_draw(6);
    manager.flush();

    assert_eq!(
        new_kinds_2d(&manager, setup),
        vec![
            Command2DKind::ColorMul,
            Command2DKind::Draw,
            Command2DKind::BlendState,
            Command2DKind::PsTexture(0),
            Command2DKind::Draw,
        ]
    );
    // The second draw sees the texture committed for it.
    let texture_command = manager.commands()[setup + 3];
    assert_eq!(
        manager.ps_textures(0).get(texture_command.index),
        Some(&TextureId(1))
    );
}

#[test]
fn test_consecutive_draws_accumulate() {
    let mut manager = CommandManager2D::new();
    let setup = manager.commands().len();

    for count in [3, 6, 9] {
        manager.push_draw(count);
    }
    manager.flush();

    assert_eq!(
        &manager.commands()[setup..],
        &[Command::new(Command2DKind::Draw, 0)]
    );
    assert_eq!(manager.draw(0), Some(DrawCommand2D { index_count: 18 }));
}

#[test]
fn test_reset_keeps_current_values() {
    let mut manager = CommandManager2D::new();
    let setup = manager.commands().len();

    manager.push_color_mul(Color::GREEN);
    manager.push_draw(6);
    manager.flush();
    manager.reset();

    assert_eq!(manager.commands().len(), setup);
    assert_eq!(*manager.color_mul().current(), Color::GREEN);
    assert_eq!(manager.color_mul().get(0), Some(&Color::GREEN));

    manager.flush();
    assert_eq!(manager.commands().len(), setup);
}

#[test]
fn test_constant_buffer_push_closes_pending_draw() {
    let mut manager = CommandManager2D::new();
    let setup = manager.commands().len();
    let buffer = ConstantBuffer::detached(ConstantBufferId(1));

    manager.push_draw(6);
    manager.push_constant_buffer(ShaderStage::Vertex, 2, &buffer, &[Vec4::X]);

    assert_eq!(new_kinds_2d(&manager, setup), vec![Command2DKind::Draw]);
}

#[test]
fn test_3d_lighting_coalesces() {
    let mut manager = CommandManager3D::new();
    let setup = manager.commands().len();

    manager.push_sun_color(Vec3::ONE);
    manager.push_sun_color(Vec3::ONE);
    manager.push_global_ambient_color(Vec3::ZERO);
    manager.flush();

    let kinds: Vec<_> = manager.commands()[setup..].iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![Command3DKind::GlobalAmbientColor, Command3DKind::SunColor]
    );
}

#[test]
fn test_3d_mesh_pins_release_on_reset() {
    let mut manager = CommandManager3D::new();
    let mesh = Mesh::detached(MeshId(5));

    manager.push_mesh(&mesh);
    manager.push_draw(0, 6, PhongMaterial::default(), 1);
    assert!(manager.is_mesh_reserved(MeshId(5)));

    manager.reset();
    assert!(!manager.is_mesh_reserved(MeshId(5)));
    assert!(!manager.has_draw());
    assert_eq!(*manager.meshes().current(), MeshId::INVALID);
}
