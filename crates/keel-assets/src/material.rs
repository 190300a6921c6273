//! Resolved materials with one texture slot per channel.

use std::sync::Arc;

use keel_scene::TextureChannel;

use crate::texture::TextureAsset;

/// A resolved material. Textures are shared, so meshes referencing the same
/// image hold the same allocation.
#[derive(Debug, Clone, Default)]
pub struct Material {
    pub name: String,
    pub albedo: Option<Arc<TextureAsset>>,
    pub normal: Option<Arc<TextureAsset>>,
    pub metalness: Option<Arc<TextureAsset>>,
    pub ambient_occlusion: Option<Arc<TextureAsset>>,
    pub roughness: Option<Arc<TextureAsset>>,
    pub displacement: Option<Arc<TextureAsset>>,
}

impl Material {
    pub fn channel(&self, channel: TextureChannel) -> Option<&Arc<TextureAsset>> {
        match channel {
            TextureChannel::Albedo => self.albedo.as_ref(),
            TextureChannel::Normal => self.normal.as_ref(),
            TextureChannel::Metalness => self.metalness.as_ref(),
            TextureChannel::AmbientOcclusion => self.ambient_occlusion.as_ref(),
            TextureChannel::Roughness => self.roughness.as_ref(),
            TextureChannel::Displacement => self.displacement.as_ref(),
        }
    }

    pub fn set_channel(&mut self, channel: TextureChannel, texture: Arc<TextureAsset>) {
        let slot = match channel {
            TextureChannel::Albedo => &mut self.albedo,
            TextureChannel::Normal => &mut self.normal,
            TextureChannel::Metalness => &mut self.metalness,
            TextureChannel::AmbientOcclusion => &mut self.ambient_occlusion,
            TextureChannel::Roughness => &mut self.roughness,
            TextureChannel::Displacement => &mut self.displacement,
        };
        *slot = Some(texture);
    }

    /// Number of channels carrying a texture.
    pub fn texture_count(&self) -> usize {
        TextureChannel::ALL
            .iter()
            .filter(|&&channel| self.channel(channel).is_some())
            .count()
    }
}
