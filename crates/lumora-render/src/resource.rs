//! Resource ids and pinned handles.
//!
//! Textures, shaders, meshes and constant buffers are owned by external
//! resource managers. Command streams only store their ids; a [`Handle`]
//! additionally keeps the owning object alive until the frame that referenced
//! it has been replayed.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            /// Sentinel meaning "nothing bound".
            pub const INVALID: $name = $name(u32::MAX);

            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn is_valid(self) -> bool {
                self.0 != u32::MAX
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::INVALID
            }
        }
    };
}

resource_id!(
    /// Id of a texture or render texture.
    TextureId
);
resource_id!(VertexShaderId);
resource_id!(PixelShaderId);
resource_id!(MeshId);
resource_id!(ConstantBufferId);

/// An id plus a strong reference to the object it names.
///
/// Equality and hashing only look at the id.
#[derive(Clone)]
pub struct Handle<Id> {
    id: Id,
    owner: Arc<dyn Any + Send + Sync>,
}

impl<Id: Copy> Handle<Id> {
    pub fn new(id: Id, owner: Arc<dyn Any + Send + Sync>) -> Self {
        Self { id, owner }
    }

    /// A handle whose lifetime is managed elsewhere, e.g. built-in shaders.
    pub fn detached(id: Id) -> Self {
        Self {
            id,
            owner: Arc::new(()),
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    /// Number of strong references to the owning object, pins included.
    pub fn owner_count(&self) -> usize {
        Arc::strong_count(&self.owner)
    }
}

impl<Id: PartialEq> PartialEq for Handle<Id> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<Id: Eq> Eq for Handle<Id> {}

impl<Id: Hash> Hash for Handle<Id> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<Id: fmt::Debug> fmt::Debug for Handle<Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.id).finish()
    }
}

pub type Texture = Handle<TextureId>;
pub type RenderTexture = Handle<TextureId>;
pub type VertexShader = Handle<VertexShaderId>;
pub type PixelShader = Handle<PixelShaderId>;
pub type Mesh = Handle<MeshId>;
pub type ConstantBuffer = Handle<ConstantBufferId>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_sentinel() {
        assert!(!TextureId::INVALID.is_valid());
        assert!(TextureId::new(0).is_valid());
        assert_eq!(MeshId::default(), MeshId::INVALID);
    }

    #[test]
    fn test_handle_equality_ignores_owner() {
        let a = Texture::new(TextureId(3), Arc::new(1u32));
        let b = Texture::detached(TextureId(3));
        assert_eq!(a, b);
        assert_ne!(a, Texture::detached(TextureId(4)));
    }

    #[test]
    fn test_handle_keeps_owner_alive() {
        let owner: Arc<dyn Any + Send + Sync> = Arc::new(String::from("pixels"));
        let handle = Texture::new(TextureId(0), owner.clone());
        assert_eq!(handle.owner_count(), 2);

        let pinned = handle.clone();
        assert_eq!(owner.downcast_ref::<String>().map(String::as_str), Some("pixels"));
        assert_eq!(pinned.owner_count(), 3);
    }
}
