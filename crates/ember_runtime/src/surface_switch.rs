//! Software pre-render followed by a swap to the accelerated surface
//!
//! The software surface paints the first frames while the accelerated one
//! warms up. Once enough frames have been painted, the draw handler moves to
//! the accelerated surface, the scheduler's surface slot is swapped, and the
//! software surface is disposed. The software surface keeps showing its last
//! frame until the accelerated surface presents, so there is no blank frame.

use std::sync::{Arc, Mutex};

use ember_platform::SurfaceProvider;

use crate::scheduler::FrameScheduler;

/// Switch progress
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwitchState {
    /// Software surface active; `frames` painted so far
    Warming { frames: u32 },
    /// Accelerated surface active
    Steady,
}

pub struct SurfaceSwitch {
    state: Mutex<SwitchState>,
    threshold: u32,
    accelerated: Mutex<Option<Arc<dyn SurfaceProvider>>>,
}

impl SurfaceSwitch {
    /// Swap to `accelerated` after `frames` software frames
    pub fn new(accelerated: Arc<dyn SurfaceProvider>, frames: u32) -> Self {
        Self {
            state: Mutex::new(SwitchState::Warming { frames: 0 }),
            threshold: frames.max(1),
            accelerated: Mutex::new(Some(accelerated)),
        }
    }

    pub fn state(&self) -> SwitchState {
        *self.state.lock().unwrap()
    }

    /// Count a painted frame; true exactly once, when the swap is due
    pub fn record_frame(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        match &mut *state {
            SwitchState::Warming { frames } => {
                *frames = frames.saturating_add(1);
                *frames == self.threshold
            }
            SwitchState::Steady => false,
        }
    }

    /// Move the draw handler to the accelerated surface and retire the
    /// software one
    ///
    /// Must run outside the software surface's paint callback. Teardown
    /// errors are logged and the swap still completes.
    pub fn complete(&self, scheduler: &FrameScheduler) -> bool {
        let Some(accelerated) = self.accelerated.lock().unwrap().take() else {
            return false;
        };

        let previous = scheduler.surface();
        let handler = previous.as_ref().and_then(|s| s.draw_handler());
        accelerated.set_draw_handler(handler);
        let retired = scheduler.replace_surface(Some(accelerated));
        *self.state.lock().unwrap() = SwitchState::Steady;

        if let Some(software) = retired {
            software.set_draw_handler(None);
            if let Err(e) = software.dispose() {
                tracing::warn!("SurfaceSwitch: software surface teardown failed: {}", e);
            }
        }
        tracing::debug!("SurfaceSwitch: accelerated surface active");
        scheduler.update();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, RenderGate};
    use ember_core::{Canvas, PixelCanvas, Rect};
    use ember_platform::{AcceleratedSurface, QueueDispatcher, SoftwareSurface};

    #[test]
    fn test_switch_moves_handler_and_disposes_software() {
        let dispatcher = Arc::new(QueueDispatcher::new());
        let scheduler = FrameScheduler::new(
            &EngineConfig::default(),
            dispatcher.clone(),
            Arc::new(RenderGate::default()),
        );
        let software = Arc::new(SoftwareSurface::new(4, 4));
        software.set_draw_handler(Some(Arc::new(|_: &mut dyn Canvas, _: Rect| false)));
        scheduler.replace_surface(Some(software.clone()));
        let accelerated = Arc::new(AcceleratedSurface::new(PixelCanvas::new(4, 4)));

        let switch = SurfaceSwitch::new(accelerated.clone(), 2);
        assert!(!switch.record_frame());
        assert_eq!(switch.state(), SwitchState::Warming { frames: 1 });
        assert!(switch.record_frame());
        assert!(!switch.record_frame());

        assert!(switch.complete(&scheduler));
        assert!(!switch.complete(&scheduler));
        assert_eq!(switch.state(), SwitchState::Steady);
        assert!(software.is_disposed());
        assert!(accelerated.draw_handler().is_some());
        assert_eq!(
            scheduler.surface().map(|s| s.kind()),
            Some(ember_platform::SurfaceKind::Accelerated)
        );
    }
}
