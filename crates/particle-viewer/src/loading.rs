use anyhow::{anyhow, Result};
use particle_morph::{Gesture, PointCloudLoader, ShapeSource, StateRegistry};
use std::{
    sync::mpsc::{self, Receiver, TryRecvError},
    thread,
    time::{Duration, Instant},
};

/// A registry being resolved on a worker thread.
pub struct BackgroundLoad {
    rx: Receiver<particle_morph::Result<StateRegistry>>,
    started: Instant,
}

impl BackgroundLoad {
    /// Start resolving `table` through `loader` off the calling thread.
    pub fn spawn(loader: PointCloudLoader, table: Vec<(Gesture, ShapeSource)>) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("ptcl-loader".into())
            .spawn(move || {
                let registry = loader.load_registry(table.iter().map(|(g, s)| (*g, s)));
                // Receiver gone means the viewer already exited.
                let _ = tx.send(registry);
            })?;

        Ok(Self {
            rx,
            started: Instant::now(),
        })
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Non-blocking. `None` while the worker is still running.
    pub fn try_take(&self) -> Option<Result<StateRegistry>> {
        match self.rx.try_recv() {
            Ok(registry) => Some(registry.map_err(Into::into)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(anyhow!("loader thread exited early"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use particle_morph::{DeviceClass, DirResources, SceneConfig, SceneContext};
    use std::sync::Arc;

    fn wait(load: &BackgroundLoad) -> Result<StateRegistry> {
        let deadline = Instant::now() + Duration::from_secs(30);
        loop {
            if let Some(done) = load.try_take() {
                return done;
            }
            assert!(Instant::now() < deadline, "background load timed out");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn registry_arrives_and_clears_loading_flag() {
        let config = SceneConfig::default();
        let table = config.shape_table().map(|(g, s)| (g, s.clone())).collect();
        let loader = PointCloudLoader::new(Arc::new(DirResources::new("missing-assets")), 256, 7);
        let mut scene = SceneContext::new(config, DeviceClass::Desktop, 7);
        assert!(scene.flags().loading);

        let load = BackgroundLoad::spawn(loader, table).unwrap();
        let registry = wait(&load).unwrap();
        assert_eq!(registry.particle_count(), 256);

        scene.install(registry).unwrap();
        assert!(!scene.flags().loading);
        assert_eq!(scene.particle_count(), 256);
    }

    #[test]
    fn load_errors_are_delivered() {
        let table = vec![(
            Gesture::ALL[0],
            ShapeSource::Text {
                lines: Vec::new(),
                scale: 1.0,
            },
        )];
        let loader = PointCloudLoader::new(Arc::new(DirResources::new("missing-assets")), 64, 1);

        let load = BackgroundLoad::spawn(loader, table).unwrap();
        assert!(wait(&load).is_err());
    }
}
