//! Geometry binding: which renderable surface (flat plane or imported
//! model) carries the heat overlay. Switching is a pure visibility toggle —
//! both meshes are uploaded once at model-load time and never re-created,
//! so the bound heat texture stays continuous frame to frame.

use wgpu::util::DeviceExt;

use crate::model::HeatmapModelData;

/// Which surface the heat overlay is projected onto. Exactly one renders
/// at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryMode {
    Plane,
    Model,
}

/// Pure visibility state machine. A surface renders only if it is the
/// active mode AND the external show-heatmap flag is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinderState {
    pub mode: GeometryMode,
    pub is_visible: bool,
}

impl BinderState {
    pub fn new() -> Self {
        Self {
            mode: GeometryMode::Plane,
            is_visible: true,
        }
    }

    pub fn set_mode(&mut self, mode: GeometryMode) {
        self.mode = mode;
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.is_visible = visible;
    }

    /// Whether the given surface's mesh should render this frame.
    pub fn surface_visible(&self, surface: GeometryMode) -> bool {
        self.is_visible && self.mode == surface
    }
}

/// GPU-resident mesh for one surface.
pub struct SurfaceSlot {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl SurfaceSlot {
    fn new(device: &wgpu::Device, label: &str, mesh: &crate::model::SurfaceMeshData) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}_vertex_buffer")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}_index_buffer")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }
}

/// Owns the surface meshes and the visibility state selecting between them.
pub struct GeometryBinder {
    state: BinderState,
    plane: SurfaceSlot,
    model: Option<SurfaceSlot>,
}

impl GeometryBinder {
    pub fn new(device: &wgpu::Device, data: &HeatmapModelData) -> Self {
        let plane = SurfaceSlot::new(device, "plane", &data.plane);
        let model = data
            .model
            .as_ref()
            .map(|mesh| SurfaceSlot::new(device, "model", mesh));
        Self {
            state: BinderState::new(),
            plane,
            model,
        }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn set_mode(&mut self, mode: GeometryMode) {
        if self.state.mode != mode {
            log::debug!("geometry mode -> {:?}", mode);
        }
        self.state.set_mode(mode);
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.state.set_visible(visible);
    }

    /// The mesh to draw this frame, if any surface is visible.
    pub fn active(&self) -> Option<&SurfaceSlot> {
        if !self.state.is_visible {
            return None;
        }
        match self.state.mode {
            GeometryMode::Plane => Some(&self.plane),
            GeometryMode::Model => self.model.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_round_trip_restores_visibility() {
        let mut state = BinderState::new();
        state.set_visible(true);
        state.set_mode(GeometryMode::Plane);
        let before = state;

        state.set_mode(GeometryMode::Model);
        assert!(state.surface_visible(GeometryMode::Model));
        assert!(!state.surface_visible(GeometryMode::Plane));

        state.set_mode(GeometryMode::Plane);
        assert_eq!(state, before);
        assert!(state.surface_visible(GeometryMode::Plane));
        assert!(!state.surface_visible(GeometryMode::Model));
    }

    #[test]
    fn hidden_overrides_active_mode() {
        let mut state = BinderState::new();
        state.set_mode(GeometryMode::Plane);
        state.set_visible(false);
        // Visibility gate is independent of the active-mode gate: both
        // surfaces are hidden.
        assert!(!state.surface_visible(GeometryMode::Plane));
        assert!(!state.surface_visible(GeometryMode::Model));
    }

    #[test]
    fn exactly_one_surface_visible_when_shown() {
        for mode in [GeometryMode::Plane, GeometryMode::Model] {
            let state = BinderState {
                mode,
                is_visible: true,
            };
            let visible: Vec<_> = [GeometryMode::Plane, GeometryMode::Model]
                .into_iter()
                .filter(|&s| state.surface_visible(s))
                .collect();
            assert_eq!(visible, vec![mode]);
        }
    }
}
