use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::camera::PerspectiveCamera;
use crate::error::ViewerError;
use crate::scene::Scene;

/// Defers a callback to the next display refresh (`requestAnimationFrame` in the browser).
///
/// On `Err` the callback has been dropped and will never run.
pub trait FrameRequester {
    fn request_frame(&self, callback: Box<dyn FnOnce()>) -> Result<(), ViewerError>;
}

/// Draws a scene through the rendering engine.
pub trait SceneRenderer {
    fn draw(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), ViewerError>;

    fn resize(&mut self, width: f64, height: f64) -> Result<(), ViewerError>;
}

/// Frame-synchronised redraws. Requests made while a frame is pending share that frame.
#[derive(Clone)]
pub struct RenderLoop {
    frames: Rc<dyn FrameRequester>,
    renderer: Rc<RefCell<dyn SceneRenderer>>,
    scene: Rc<RefCell<Scene>>,
    camera: Rc<RefCell<PerspectiveCamera>>,
    pending: Rc<Cell<bool>>,
    frames_drawn: Rc<Cell<u64>>,
}

impl RenderLoop {
    pub fn new(
        frames: Rc<dyn FrameRequester>,
        renderer: Rc<RefCell<dyn SceneRenderer>>,
        scene: Rc<RefCell<Scene>>,
        camera: Rc<RefCell<PerspectiveCamera>>,
    ) -> Self {
        Self {
            frames,
            renderer,
            scene,
            camera,
            pending: Rc::new(Cell::new(false)),
            frames_drawn: Rc::new(Cell::new(0)),
        }
    }

    pub fn request_redraw(&self) {
        if self.pending.replace(true) {
            return;
        }
        let this = self.clone();
        if let Err(err) = self.frames.request_frame(Box::new(move || this.draw_frame())) {
            // No frame is coming, so the next request has to ask again
            self.pending.set(false);
            log::error!("Could not schedule a frame: {}", err);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.get()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn.get()
    }

    fn draw_frame(&self) {
        self.pending.set(false);
        let scene = self.scene.borrow();
        let camera = self.camera.borrow();
        match self.renderer.borrow_mut().draw(&scene, &camera) {
            Ok(()) => self.frames_drawn.set(self.frames_drawn.get() + 1),
            Err(err) => log::error!("Frame skipped: {}", err),
        }
    }
}
