use criterion::{criterion_group, criterion_main, Criterion};
use crumbs_core::{GameConfig, PlayerState};
use crumbs_runtime::autoplay::{self, AutoplayConfig};
use crumbs_runtime::{Game, SeededRolls};
use rust_decimal::Decimal;

fn fresh_game() -> Game {
    let mut state = PlayerState::default();
    state.helpers.insert("pastry_chef".into(), 25);
    state.upgrades.insert("CLICK_POWER".into(), 10);
    state.money = Decimal::from(1_000_000);
    Game::new(state, GameConfig::default(), Box::new(SeededRolls::new(42)), 0)
}

fn bench_taps(c: &mut Criterion) {
    let mut game = fresh_game();
    let mut now = 0u64;
    c.bench_function("tap", |b| {
        b.iter(|| {
            now += 1;
            let _ = game.tap(now, 0.0, 0.0);
            game.drain_events();
        })
    });
}

fn bench_advance(c: &mut Criterion) {
    let mut game = fresh_game();
    let mut now = 0u64;
    c.bench_function("advance_1s", |b| {
        b.iter(|| {
            now += 1_000;
            game.advance(now);
            game.drain_events();
        })
    });
}

fn bench_autoplay(c: &mut Criterion) {
    let cfg = AutoplayConfig {
        seconds: 600,
        taps_per_second: 5,
    };
    c.bench_function("autoplay_10min", |b| {
        b.iter(|| {
            let mut game = Game::new(
                PlayerState::default(),
                GameConfig::default(),
                Box::new(SeededRolls::new(7)),
                0,
            );
            autoplay::run(&mut game, 0, &cfg)
        })
    });
}

criterion_group!(benches, bench_taps, bench_advance, bench_autoplay);
criterion_main!(benches);
