// Fakes for the browser seams plus a small WKB writer for fixtures
use futures::channel::oneshot;
use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::camera::PerspectiveCamera;
use crate::error::{LoadError, ViewerError};
use crate::loader::GeometrySource;
use crate::render_loop::{FrameRequester, SceneRenderer};
use crate::scene::Scene;

pub mod wkb {
    //! Little-endian ISO WKB encoding, 2D only.

    fn header(out: &mut Vec<u8>, geometry_type: u32) {
        out.push(1);
        out.extend_from_slice(&geometry_type.to_le_bytes());
    }

    fn coords(out: &mut Vec<u8>, x: f64, y: f64) {
        out.extend_from_slice(&x.to_le_bytes());
        out.extend_from_slice(&y.to_le_bytes());
    }

    fn count(out: &mut Vec<u8>, n: usize) {
        out.extend_from_slice(&(n as u32).to_le_bytes());
    }

    /// Closed axis-aligned square ring with its corner at (x, y).
    pub fn square(x: f64, y: f64, size: f64) -> Vec<(f64, f64)> {
        vec![(x, y), (x + size, y), (x + size, y + size), (x, y + size), (x, y)]
    }

    pub fn point(x: f64, y: f64) -> Vec<u8> {
        let mut out = Vec::new();
        header(&mut out, 1);
        coords(&mut out, x, y);
        out
    }

    /// Exterior ring first, then holes.
    pub fn polygon(rings: &[Vec<(f64, f64)>]) -> Vec<u8> {
        let mut out = Vec::new();
        header(&mut out, 3);
        count(&mut out, rings.len());
        for ring in rings {
            count(&mut out, ring.len());
            for &(x, y) in ring {
                coords(&mut out, x, y);
            }
        }
        out
    }

    pub fn multi_polygon(polygons: &[Vec<u8>]) -> Vec<u8> {
        let mut out = Vec::new();
        header(&mut out, 6);
        count(&mut out, polygons.len());
        for polygon in polygons {
            out.extend_from_slice(polygon);
        }
        out
    }

    pub fn collection(members: &[Vec<u8>]) -> Vec<u8> {
        let mut out = Vec::new();
        header(&mut out, 7);
        count(&mut out, members.len());
        for member in members {
            out.extend_from_slice(member);
        }
        out
    }
}

enum Scripted {
    Ready(Result<Vec<u8>, LoadError>),
    Deferred(oneshot::Receiver<Result<Vec<u8>, LoadError>>),
}

/// Geometry source answering from a table of scripted responses.
/// Every response is consumed by the first request for its path.
#[derive(Default)]
pub struct ScriptedSource {
    responses: RefCell<HashMap<String, Scripted>>,
    requested: RefCell<Vec<String>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, path: &str, response: Result<Vec<u8>, LoadError>) {
        self.responses
            .borrow_mut()
            .insert(path.to_string(), Scripted::Ready(response));
    }

    /// Keep the request for `path` pending until the returned sender fires.
    pub fn defer(&self, path: &str) -> oneshot::Sender<Result<Vec<u8>, LoadError>> {
        let (tx, rx) = oneshot::channel();
        self.responses
            .borrow_mut()
            .insert(path.to_string(), Scripted::Deferred(rx));
        tx
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }
}

impl GeometrySource for ScriptedSource {
    fn fetch(&self, path: &str) -> LocalBoxFuture<'_, Result<Vec<u8>, LoadError>> {
        self.requested.borrow_mut().push(path.to_string());
        match self.responses.borrow_mut().remove(path) {
            Some(Scripted::Ready(response)) => future::ready(response).boxed_local(),
            Some(Scripted::Deferred(rx)) => async move {
                rx.await
                    .unwrap_or_else(|_| Err(LoadError::Network("request dropped".to_string())))
            }
            .boxed_local(),
            None => future::ready(Err(LoadError::Network(format!("no response for {}", path))))
                .boxed_local(),
        }
    }
}

/// Frame requester whose frames only fire when the test says so.
/// With `fail_next` set, the next request is refused and its callback dropped.
#[derive(Default)]
pub struct ManualFrames {
    queue: RefCell<Vec<Box<dyn FnOnce()>>>,
    pub fail_next: Cell<bool>,
}

impl ManualFrames {
    /// Fire every frame requested so far. Returns how many fired.
    pub fn run_pending(&self) -> usize {
        let callbacks: Vec<_> = self.queue.borrow_mut().drain(..).collect();
        let fired = callbacks.len();
        for callback in callbacks {
            callback();
        }
        fired
    }
}

impl FrameRequester for ManualFrames {
    fn request_frame(&self, callback: Box<dyn FnOnce()>) -> Result<(), ViewerError> {
        if self.fail_next.replace(false) {
            return Err(ViewerError::Dom("scripted frame failure".to_string()));
        }
        self.queue.borrow_mut().push(callback);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub revision: u64,
    pub meshes: usize,
    pub camera_position: [f64; 3],
}

#[derive(Default)]
pub struct RecordingRenderer {
    pub draws: Vec<DrawRecord>,
    pub resizes: Vec<(f64, f64)>,
    pub fail_next: bool,
}

impl SceneRenderer for RecordingRenderer {
    fn draw(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), ViewerError> {
        if std::mem::take(&mut self.fail_next) {
            return Err(ViewerError::Render("scripted failure".to_string()));
        }
        self.draws.push(DrawRecord {
            revision: scene.revision(),
            meshes: scene.meshes().len(),
            camera_position: camera.position,
        });
        Ok(())
    }

    fn resize(&mut self, width: f64, height: f64) -> Result<(), ViewerError> {
        self.resizes.push((width, height));
        Ok(())
    }
}
