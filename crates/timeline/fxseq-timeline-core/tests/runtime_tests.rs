use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use fxseq_animation_core::{AnimatableTarget, OriginId, TargetId, TargetStore};
use fxseq_test_fixtures::{effects, scenes, RecordingTarget};
use fxseq_timeline_core::{
    resolve_durations, CatchUpPlan, EffectDeclaration, EffectRuntime, HeadlessMedia,
    MediaPlayback, TimelineConfig, TimelineState,
};

#[derive(Clone, Default)]
struct SharedMedia(Rc<RefCell<HeadlessMedia>>);

impl SharedMedia {
    fn boxed(&self) -> Option<Box<dyn MediaPlayback>> {
        Some(Box::new(self.clone()))
    }
    fn state(&self) -> HeadlessMedia {
        self.0.borrow().clone()
    }
}

impl MediaPlayback for SharedMedia {
    fn seek(&mut self, seconds: f64) {
        self.0.borrow_mut().seek(seconds);
    }
    fn play(&mut self) {
        self.0.borrow_mut().play();
    }
    fn pause(&mut self) {
        self.0.borrow_mut().pause();
    }
}

#[derive(Default)]
struct Stage {
    targets: HashMap<TargetId, RecordingTarget>,
}

impl Stage {
    fn load(name: &str) -> (Self, HashMap<String, TargetId>) {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut stage = Stage::default();
        let mut names = HashMap::new();
        let mut sprites: Vec<_> = scenes::load(name).unwrap().into_iter().collect();
        sprites.sort_by(|a, b| a.0.cmp(&b.0));
        for (i, (sprite, bag)) in sprites.into_iter().enumerate() {
            let id = TargetId(i as u32);
            stage.targets.insert(id, RecordingTarget::new(bag));
            names.insert(sprite, id);
        }
        (stage, names)
    }

    fn target(&self, id: TargetId) -> &RecordingTarget {
        &self.targets[&id]
    }
}

impl TargetStore for Stage {
    fn target_mut(&mut self, id: TargetId) -> Option<&mut dyn AnimatableTarget> {
        self.targets
            .get_mut(&id)
            .map(|t| t as &mut dyn AnimatableTarget)
    }
}

fn declaration(name: &str) -> EffectDeclaration {
    effects::load(name).unwrap()
}

fn run(rt: &mut EffectRuntime, stage: &mut Stage, dt: f64, frames: usize) {
    for _ in 0..frames {
        rt.frame(dt, stage);
    }
}

#[test]
fn fixtures_resolve_to_expected_totals() {
    let config = TimelineConfig::default();
    for name in effects::keys() {
        let decl = declaration(&name);
        let durations = resolve_durations(&decl, &config)
            .unwrap_or_else(|e| panic!("{name} failed to resolve: {e}"));
        assert_eq!(
            durations.total,
            effects::expected_total(&name).unwrap(),
            "total of {name}"
        );
    }
}

#[test]
fn fade_pulse_writes_each_key_once_per_frame() {
    let (mut stage, sprites) = Stage::load("stage");
    let hero = sprites["hero"];
    let mut rt = EffectRuntime::default();
    let playback = rt.play(declaration("fade-pulse"), hero, None, 0.0).unwrap();
    assert_eq!(playback.duration.value(), Some(1000.0));

    run(&mut rt, &mut stage, 50.0, 4);
    assert_eq!(stage.target(hero).bag.value("alpha"), Some(1.0));

    run(&mut rt, &mut stage, 50.0, 16);
    assert!(playback.ended.is_resolved());
    assert!(rt.is_empty());

    let target = stage.target(hero);
    assert_eq!(target.bag.value("alpha"), Some(0.0));
    assert_eq!(target.bag.value("scale.x"), Some(1.0));
    assert!(target.writes_to("alpha") <= 20);
    assert!(target.writes_to("scale.x") <= 20);
    assert_eq!(target.writes_to("rotation"), 0);
}

#[test]
fn sync_group_members_share_creation_time() {
    let (mut stage, sprites) = Stage::load("stage");
    let mut rt = EffectRuntime::default();

    let first = declaration("ambient-glow");
    let mut second = first.clone();
    second.id = OriginId::new_v4();
    second.logical_creation_time = 700.0;

    rt.play(first.clone(), sprites["hero"], None, 0.0).unwrap();
    run(&mut rt, &mut stage, 100.0, 10);
    let joined = rt.play(second.clone(), sprites["prop"], None, 1000.0).unwrap();

    let membership = joined.sync.unwrap();
    assert_eq!(membership.origin, first.id);
    assert_eq!(membership.logical_creation_time, 0.0);
    match joined.plan {
        CatchUpPlan::Resume {
            catch_up_offset, ..
        } => assert_eq!(catch_up_offset, 1000.0),
        other => panic!("unexpected plan {other:?}"),
    }
    assert_eq!(
        rt.replication_state(second.id).unwrap().logical_creation_time,
        0.0
    );

    // Same group name in another scene is a separate group.
    let mut elsewhere = first.clone();
    elsewhere.id = OriginId::new_v4();
    elsewhere.scene = "foyer".into();
    elsewhere.logical_creation_time = 900.0;
    let other = rt.play(elsewhere, sprites["prop"], None, 1000.0).unwrap();
    assert_eq!(other.sync.unwrap().logical_creation_time, 900.0);
    assert_eq!(rt.sync_groups().len(), 2);

    rt.cancel_effect(first.id).unwrap();
    assert_eq!(rt.sync_groups().len(), 2);
    rt.cancel_effect(second.id).unwrap();
    assert_eq!(rt.sync_groups().len(), 1);
}

#[test]
fn media_loops_through_window_with_delay() {
    let (mut stage, sprites) = Stage::load("stage");
    let mut rt = EffectRuntime::default();
    let media = SharedMedia::default();
    let playback = rt
        .play(declaration("media-loop"), sprites["hero"], media.boxed(), 0.0)
        .unwrap();
    let id = playback.id;
    assert_eq!(
        playback.plan,
        CatchUpPlan::Resume {
            catch_up_offset: 0.0,
            current_loop_index: 0,
            loop_phase_offset: 0.0,
            media_position: Some(0.2),
        }
    );
    assert!(media.state().playing);

    // Cycle is 800ms of a 100..900 window, then a 250ms gap. Media runs at
    // 2x, so the window starts 0.2s into the clip.
    run(&mut rt, &mut stage, 50.0, 16);
    assert!(!media.state().playing);
    assert_eq!(rt.timeline(id).unwrap().state(), TimelineState::Looping);
    run(&mut rt, &mut stage, 50.0, 5);
    assert!(media.state().playing);
    assert_eq!(media.state().position, 0.2);
    assert_eq!(rt.timeline(id).unwrap().current_loop_index(), 1);

    run(&mut rt, &mut stage, 50.0, 36);
    assert!(rt.is_playing(id));
    run(&mut rt, &mut stage, 50.0, 1);
    assert!(!rt.is_playing(id));
    assert!(playback.ended.is_resolved());
    let state = media.state();
    assert_eq!(state.seeks, 3);
    assert!(!state.playing);
}

#[test]
fn late_joiner_after_last_loop_finishes_immediately() {
    let (_, sprites) = Stage::load("stage");
    let mut rt = EffectRuntime::default();
    let media = SharedMedia::default();
    let playback = rt
        .play(declaration("media-loop"), sprites["hero"], media.boxed(), 4000.0)
        .unwrap();
    assert_eq!(
        playback.plan,
        CatchUpPlan::AlreadyFinished {
            hold_final_frame: false
        }
    );
    assert!(playback.ended.is_resolved());
    assert!(!rt.is_playing(playback.id));
    assert_eq!(rt.scheduler().active_batches(), 0);
    assert_eq!(media.state().seeks, 0);
}

#[test]
fn held_banner_waits_for_explicit_end() {
    let (mut stage, sprites) = Stage::load("stage");
    let hero = sprites["hero"];
    let mut rt = EffectRuntime::default();
    let media = SharedMedia::default();
    let playback = rt
        .play(declaration("held-banner"), hero, media.boxed(), 0.0)
        .unwrap();

    run(&mut rt, &mut stage, 100.0, 20);
    let timeline = rt.timeline(playback.id).unwrap();
    assert!(timeline.held_at_end());
    assert_eq!(media.state().position, 1.5);
    assert!(!media.state().playing);
    assert!(playback.ended.is_pending());
    assert_eq!(stage.target(hero).bag.value("alpha"), Some(1.0));

    rt.end_effect(playback.id).unwrap();
    run(&mut rt, &mut stage, 150.0, 1);
    assert_eq!(stage.target(hero).bag.value("alpha"), Some(0.5));
    run(&mut rt, &mut stage, 150.0, 1);
    assert!(playback.ended.is_resolved());
    assert!(rt.is_empty());
}

#[test]
fn late_joiner_of_held_effect_holds_immediately() {
    let (_, sprites) = Stage::load("stage");
    let mut rt = EffectRuntime::default();
    let media = SharedMedia::default();
    let playback = rt
        .play(declaration("held-banner"), sprites["prop"], media.boxed(), 5000.0)
        .unwrap();
    assert_eq!(
        playback.plan,
        CatchUpPlan::AlreadyFinished {
            hold_final_frame: true
        }
    );
    assert!(rt.is_playing(playback.id));
    assert_eq!(media.state().position, 1.5);
    assert!(playback.ended.is_pending());
}

#[test]
fn ending_early_revokes_pending_loop_task() {
    let (mut stage, sprites) = Stage::load("stage");
    let mut rt = EffectRuntime::default();
    let media = SharedMedia::default();
    let playback = rt
        .play(declaration("media-loop"), sprites["hero"], media.boxed(), 0.0)
        .unwrap();
    run(&mut rt, &mut stage, 100.0, 3);
    rt.end_effect(playback.id).unwrap();

    assert!(playback.ended.is_resolved());
    assert!(!rt.is_playing(playback.id));
    assert!(!media.state().playing);
    let seeks = media.state().seeks;
    run(&mut rt, &mut stage, 100.0, 40);
    assert_eq!(media.state().seeks, seeks);
}

#[test]
fn cancelling_abandons_ended_handle() {
    let (mut stage, sprites) = Stage::load("stage");
    let mut rt = EffectRuntime::default();
    let playback = rt
        .play(declaration("fade-pulse"), sprites["hero"], None, 0.0)
        .unwrap();
    run(&mut rt, &mut stage, 50.0, 2);
    rt.cancel_effect(playback.id).unwrap();
    assert!(playback.ended.is_abandoned());
    assert_eq!(rt.scheduler().active_batches(), 0);
    assert!(rt.cancel_effect(playback.id).is_err());
}
