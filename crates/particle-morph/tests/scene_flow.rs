use glam::Vec2;
use particle_morph::cloud::Bounds;
use particle_morph::{
    DeviceClass, DirResources, Easing, Frame, Gesture, GestureConfig, GestureTransform, PointCloudLoader,
    PointSink, SceneConfig, SceneContext, ShapeSource, Timing,
};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Keeps a copy of every submitted frame's uploads.
#[derive(Default)]
struct RecordingSink {
    frames: Vec<(Option<Vec<f32>>, Option<Vec<f32>>)>,
    released: usize,
}

impl RecordingSink {
    fn last_positions(&self) -> Option<&Vec<f32>> {
        self.frames.last().and_then(|(p, _)| p.as_ref())
    }
}

impl PointSink for RecordingSink {
    fn submit(&mut self, frame: &Frame<'_>) {
        self.frames.push((
            frame.positions.map(<[f32]>::to_vec),
            frame.colors.map(<[f32]>::to_vec),
        ));
    }

    fn release(&mut self) {
        self.released += 1;
    }
}

const HERO: [f32; 12] = [0., 0., 0., 1., 1., 1., 2., 2., 2., 3., 3., 3.];
const WELCOME: [f32; 12] = [1., 0., 0., 2., 1., 1., 3., 2., 2., 4., 3., 3.];

fn write_points(dir: &Path, name: &str, values: &[f32]) {
    let res = ptcl::PointResource::new(values.to_vec(), None).unwrap();
    ptcl::write_json(dir.join(format!("{name}.json")), &res).unwrap();
}

fn mesh_entry(name: &str) -> GestureConfig {
    GestureConfig {
        shape: ShapeSource::mesh(name),
        opacity: 1.0,
        desktop: GestureTransform::default(),
        constrained: GestureTransform::default(),
    }
}

fn two_state_scene(dir: &Path) -> SceneContext {
    write_points(dir, "hero", &HERO);
    write_points(dir, "welcome", &WELCOME);

    let mut config = SceneConfig::default();
    config.particles.desktop = 4;
    config.timings.morph = Timing::new(1000.0, Easing::Linear);
    config.gestures = BTreeMap::from([
        (Gesture::Hero, mesh_entry("hero")),
        (Gesture::Welcome, mesh_entry("welcome")),
    ]);

    let loader = PointCloudLoader::new(Arc::new(DirResources::new(dir)), 4, 1);
    let mut scene = SceneContext::new(config, DeviceClass::Desktop, 1);
    scene.load(&loader).unwrap();
    scene
}

#[test]
fn hero_to_welcome_interpolates_then_lands_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let mut scene = two_state_scene(dir.path());
    let mut sink = RecordingSink::default();

    assert_eq!(scene.live_positions(), &HERO);
    assert!(scene.request_state(Gesture::Welcome, 0.0).unwrap());
    assert!(scene.flags().is_morphing);

    scene.tick(500.0, &mut sink);
    let halfway = [0.5, 0., 0., 1.5, 1., 1., 2.5, 2., 2., 3.5, 3., 3.];
    assert_eq!(scene.live_positions(), &halfway);
    assert_eq!(sink.last_positions().unwrap(), &halfway.to_vec());

    scene.tick(1000.0, &mut sink);
    assert_eq!(scene.live_positions(), &WELCOME);
    assert!(!scene.flags().is_morphing);

    // At rest with no pointer nothing is re-uploaded.
    scene.tick(1016.0, &mut sink);
    assert!(sink.last_positions().is_none());
}

#[test]
fn pointer_disperses_then_settles_back_to_rest() {
    let dir = tempfile::tempdir().unwrap();
    let mut scene = two_state_scene(dir.path());
    let mut sink = RecordingSink::default();

    scene.request_state(Gesture::Welcome, 0.0).unwrap();
    scene.tick(1000.0, &mut sink);

    scene.set_pointer(Some(Vec2::ZERO));
    let mut now = 1000.0;
    for _ in 0..30 {
        now += 16.0;
        scene.tick(now, &mut sink);
    }
    assert_ne!(scene.live_positions(), &WELCOME);

    scene.set_pointer(None);
    for _ in 0..400 {
        now += 16.0;
        scene.tick(now, &mut sink);
    }
    assert_eq!(scene.live_positions(), &WELCOME);
}

#[test]
fn new_request_mid_morph_snapshots_the_live_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let mut scene = two_state_scene(dir.path());
    let mut sink = RecordingSink::default();

    scene.request_state(Gesture::Welcome, 0.0).unwrap();
    scene.tick(500.0, &mut sink);

    // Back to hero from the halfway point.
    assert!(scene.request_state(Gesture::Hero, 500.0).unwrap());
    scene.tick(1000.0, &mut sink);
    let expected = [0.25, 0., 0., 1.25, 1., 1., 2.25, 2., 2., 3.25, 3., 3.];
    assert_eq!(scene.live_positions(), &expected);

    scene.tick(1500.0, &mut sink);
    assert_eq!(scene.live_positions(), &HERO);

    scene.teardown(&mut sink);
    assert_eq!(sink.released, 1);
}

#[test]
fn default_table_registers_every_gesture_at_one_length() {
    let dir = tempfile::tempdir().unwrap();
    // Only hero has a mesh; the others fall back to degenerate clouds or
    // procedural shapes.
    std::fs::write(
        dir.path().join("hero.obj"),
        "v 0 0 0\nv 4 0 0\nv 0 2 0\nv 0 0 1\nf 1 2 3\nf 1 2 4\nf 1 3 4\nf 2 3 4\n",
    )
    .unwrap();

    let mut config = SceneConfig::default();
    config.particles.desktop = 600;
    config.timings.morph = Timing::new(100.0, Easing::Linear);

    let loader = PointCloudLoader::new(Arc::new(DirResources::new(dir.path())), 600, 5);
    let mut scene = SceneContext::new(config, DeviceClass::Desktop, 5);
    scene.load(&loader).unwrap();
    assert_eq!(scene.particle_count(), 600);

    let hero = Bounds::of(scene.live_positions()).unwrap();
    assert!((hero.largest_extent() - 10.0).abs() < 1e-3);
    assert!(hero.center().length() < 1e-3);

    let mut sink = RecordingSink::default();
    let mut now = 0.0;
    for gesture in Gesture::ALL {
        scene.request_state(gesture, now).unwrap();
        if gesture == Gesture::Gallery {
            assert!(!scene.flags().content_revealed);
        }
        now += 100.0;
        scene.tick(now, &mut sink);
        assert_eq!(scene.live_positions().len(), 1800);
        assert!(!scene.flags().is_morphing, "{gesture}");
        assert_eq!(scene.flags().is_interactive, gesture == Gesture::Globe);
        assert_eq!(
            scene.flags().content_revealed,
            gesture == Gesture::Gallery,
            "{gesture}"
        );
    }
}
