use eqwalker::audio::{band_energy, BeatDetector};
use eqwalker::envelope::Envelope;
use eqwalker::freq_map::FrequencyMap;
use eqwalker::params::{BeatConfig, SpectrumConfig, RIG_MULTIPLIER_RANGE};
use eqwalker::render::{solve_pose, RigInput, RigParams};
use proptest::prelude::*;

fn map_with(columns: usize) -> FrequencyMap {
    FrequencyMap::new(&SpectrumConfig {
        columns,
        ..SpectrumConfig::default()
    })
}

fn multiplier() -> impl Strategy<Value = f32> {
    RIG_MULTIPLIER_RANGE
}

prop_compose! {
    fn rig_params()(
        head in multiplier(),
        body in multiplier(),
        arm in multiplier(),
        leg in multiplier(),
        shoulders in multiplier(),
        hips in multiplier(),
        visor in (multiplier(), multiplier()),
        pack in multiplier(),
        motion_amp in 0.0f32..=1.0,
    ) -> RigParams {
        RigParams {
            head,
            body,
            arm,
            leg,
            shoulders,
            hips,
            visor_w: visor.0,
            visor_h: visor.1,
            pack,
            motion_amp,
            ..RigParams::default()
        }
    }
}

proptest! {
    #[test]
    fn test_edges_strictly_increasing(columns in 1usize..=256) {
        let map = map_with(columns);
        let edges = map.edges();
        let config = SpectrumConfig::default();

        prop_assert_eq!(edges.len(), columns + 1);
        prop_assert!((edges[0] - config.min_hz).abs() < 1e-3);
        prop_assert!((edges[columns] - config.max_hz).abs() / config.max_hz < 1e-4);
        for pair in edges.windows(2) {
            prop_assert!(pair[1] > pair[0], "edges {} then {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_axis_position_follows_edges(columns in 1usize..=256) {
        let map = map_with(columns);
        let xs: Vec<f32> = map.edges().iter().map(|&hz| map.hz_to_x_norm(hz)).collect();
        prop_assert!(xs[0].abs() < 1e-6);
        prop_assert!((xs[columns] - 1.0).abs() < 1e-4);
        for pair in xs.windows(2) {
            prop_assert!(pair[1] >= pair[0]);
        }
    }

    #[test]
    fn test_legs_stay_within_bounds(
        body_yaw in -0.95f32..=0.95,
        look_yaw in -0.95f32..=0.95,
        motion in 0.0f32..=1.0,
        hang in 0.0f32..=1.0,
        phase in 0.0f32..50.0,
        (bass, kick) in (0.0f32..=1.0, 0.0f32..=1.0),
        playing in any::<bool>(),
        dpr in 1.0f32..=3.0,
        walk_dir in prop_oneof![Just(-1.0f32), Just(1.0f32)],
        scale in 1.0f32..=4.0,
        rig in rig_params(),
    ) {
        // Same lift the scrub spring applies at full hang
        let lift = 74.0 * dpr * hang;
        let pose = solve_pose(
            &RigInput {
                x: 200.0 * dpr,
                foot_y: 300.0 * dpr - lift,
                ground_y: 300.0 * dpr,
                scale,
                dpr,
                body_yaw,
                look_yaw,
                motion,
                hang,
                pull: look_yaw,
                phase,
                walk_dir,
                bass,
                mids: bass,
                air: kick,
                kick,
                playing,
                ..Default::default()
            },
            &rig,
        );

        let eps = 1e-2 * dpr * scale;
        for leg in &pose.legs {
            let len = leg.length();
            prop_assert!(len >= pose.min_leg - eps && len <= pose.max_leg + eps,
                "leg length {} outside [{}, {}]", len, pose.min_leg, pose.max_leg);
        }
        prop_assert!(pose.foot_gap() >= pose.min_sep - eps,
            "foot gap {} < {}", pose.foot_gap(), pose.min_sep);
    }

    #[test]
    fn test_envelope_never_overshoots(
        start in 0.0f32..=1.0,
        target in 0.0f32..=1.0,
        attack in 0.0f32..=1.0,
        release in 0.0f32..=1.0,
        dt in 0.001f32..=0.05,
        mode in 0usize..3,
    ) {
        let mut env = match mode {
            0 => Envelope::per_frame(attack, release),
            1 => Envelope::per_reference_frame(attack, release),
            _ => Envelope::per_second(attack * 40.0, release * 40.0),
        }
        .with_value(start);

        let v = env.update(target, dt);
        let (lo, hi) = (start.min(target), start.max(target));
        prop_assert!(v >= lo - 1e-6 && v <= hi + 1e-6, "{} left [{}, {}]", v, lo, hi);
    }

    #[test]
    fn test_envelope_converges(
        start in 0.0f32..=1.0,
        target in 0.0f32..=1.0,
        attack in 0.05f32..=1.0,
        release in 0.05f32..=1.0,
        dt in (1.0f32 / 120.0)..=0.05,
        mode in 0usize..3,
    ) {
        let mut env = match mode {
            0 => Envelope::per_frame(attack, release),
            1 => Envelope::per_reference_frame(attack, release),
            _ => Envelope::per_second(attack * 40.0, release * 40.0),
        }
        .with_value(start);

        for _ in 0..2000 {
            env.update(target, dt);
        }
        prop_assert!((env.value - target).abs() < 1e-3);
    }

    #[test]
    fn test_beats_respect_cooldown(bass in prop::collection::vec(0.0f32..=1.0, 1..400)) {
        let config = BeatConfig::default();
        let cooldown = config.cooldown_s;
        let dt = 1.0 / 60.0;
        let mut detector = BeatDetector::new(config);

        let mut last_beat: Option<usize> = None;
        let mut beats = 0u64;
        for (i, &b) in bass.iter().enumerate() {
            let frame = detector.update(b, true, dt);
            if frame.beat {
                if let Some(prev) = last_beat {
                    let gap = (i - prev) as f32 * dt;
                    prop_assert!(gap >= cooldown - 1e-4, "beats {}s apart", gap);
                }
                last_beat = Some(i);
                beats += 1;
            }
            prop_assert_eq!(frame.count, beats);
            prop_assert!((0.0..=1.0).contains(&frame.kick));
        }
    }

    #[test]
    fn test_paused_never_beats(bass in prop::collection::vec(0.0f32..=1.0, 1..200)) {
        let mut detector = BeatDetector::new(BeatConfig::default());
        for &b in &bass {
            prop_assert!(!detector.update(b, false, 1.0 / 60.0).beat);
        }
    }

    #[test]
    fn test_band_energy_is_normalized(
        freq in prop::collection::vec(any::<u8>(), 1024),
        hz0 in 0.0f32..20000.0,
        span in 0.0f32..5000.0,
    ) {
        let e = band_energy(&freq, 48000, freq.len(), hz0, hz0 + span);
        prop_assert!(e.is_finite() && (0.0..=1.0).contains(&e));
    }
}
