pub mod fingerprint;
pub mod profiling;

/// Frame-indexed state history with rewind/forward.
///
/// When built with a limit the oldest frames are dropped once the history
/// grows past it; frame numbers stay absolute, so `frame()` keeps counting and
/// rewinding stops at the oldest frame still held.
#[derive(Debug)]
pub struct TimeMachine<State> {
    states: Vec<State>,
    base_frame: usize,
    frame: usize,
    limit: Option<usize>,
}

impl<State> TimeMachine<State> {
    pub fn new(initial_state: State) -> Self {
        Self {
            states: vec![initial_state],
            base_frame: 0,
            frame: 0,
            limit: None,
        }
    }

    pub fn with_limit(initial_state: State, limit: usize) -> Self {
        Self {
            limit: Some(limit.max(1)),
            ..Self::new(initial_state)
        }
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn state(&self) -> &State {
        &self.states[self.frame - self.base_frame]
    }

    pub fn rewind(&mut self, frames: usize) -> usize {
        self.frame = self.frame.saturating_sub(frames).max(self.base_frame);
        self.frame
    }

    pub fn forward(&mut self, frames: usize) -> usize {
        let max_frame = self.base_frame + self.states.len().saturating_sub(1);
        self.frame = (self.frame + frames).min(max_frame);
        self.frame
    }

    pub fn record(&mut self, state: State) -> usize {
        let idx = self.frame - self.base_frame;
        if idx + 1 < self.states.len() {
            self.states.truncate(idx + 1);
        }
        self.states.push(state);
        self.frame += 1;

        if let Some(limit) = self.limit {
            let overflow = self.states.len().saturating_sub(limit);
            if overflow > 0 {
                self.states.drain(..overflow);
                self.base_frame += overflow;
            }
        }
        self.frame
    }
}

/// Deterministic transition function driven by a [`HeadlessRunner`].
pub trait GameLogic {
    type State;
    type Input;

    fn initial_state(&self) -> Self::State;
    fn step(&self, state: &Self::State, input: Self::Input) -> Self::State;
}

#[derive(Debug)]
pub struct HeadlessRunner<G: GameLogic> {
    game: G,
    timemachine: TimeMachine<G::State>,
}

impl<G: GameLogic> HeadlessRunner<G> {
    pub fn new(game: G) -> Self {
        let initial_state = game.initial_state();
        Self {
            game,
            timemachine: TimeMachine::new(initial_state),
        }
    }

    pub fn with_history_limit(game: G, limit: usize) -> Self {
        let initial_state = game.initial_state();
        Self {
            game,
            timemachine: TimeMachine::with_limit(initial_state, limit),
        }
    }

    pub fn frame(&self) -> usize {
        self.timemachine.frame()
    }

    pub fn state(&self) -> &G::State {
        self.timemachine.state()
    }

    pub fn step(&mut self, input: G::Input) -> usize {
        let next_state = self.game.step(self.timemachine.state(), input);
        self.timemachine.record(next_state)
    }

    pub fn step_profiled<P: profiling::Profiler>(
        &mut self,
        input: G::Input,
        profiler: &mut P,
    ) -> usize {
        use std::time::Instant;

        let total_start = Instant::now();

        let apply_start = Instant::now();
        let next_state = self.game.step(self.timemachine.state(), input);
        let apply_dt = apply_start.elapsed();

        let publish_start = Instant::now();
        let frame = self.timemachine.record(next_state);
        let publish_dt = publish_start.elapsed();

        profiler.on_step(
            frame as u64,
            profiling::StepTimings {
                apply: apply_dt,
                publish: publish_dt,
                total: total_start.elapsed(),
            },
        );

        frame
    }

    pub fn run<I>(&mut self, inputs: I) -> usize
    where
        I: IntoIterator<Item = G::Input>,
    {
        let mut last_frame = self.frame();
        for input in inputs {
            last_frame = self.step(input);
        }
        last_frame
    }

    pub fn rewind(&mut self, frames: usize) -> usize {
        self.timemachine.rewind(frames)
    }

    pub fn forward(&mut self, frames: usize) -> usize {
        self.timemachine.forward(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiling::{Profiler, StepTimings};

    struct Additive;

    impl GameLogic for Additive {
        type State = i32;
        type Input = i32;

        fn initial_state(&self) -> Self::State {
            0
        }

        fn step(&self, state: &Self::State, input: Self::Input) -> Self::State {
            *state + input
        }
    }

    #[test]
    fn timemachine_rewind_and_branch() {
        let mut tm = TimeMachine::new(0);
        tm.record(1);
        tm.record(2);
        assert_eq!(tm.state(), &2);

        tm.rewind(1);
        assert_eq!(tm.state(), &1);

        tm.record(99);
        assert_eq!(tm.frame(), 2);
        assert_eq!(tm.state(), &99);

        // Recording after a rewind drops the old branch.
        tm.forward(5);
        assert_eq!(tm.frame(), 2);
        tm.rewind(2);
        assert_eq!(tm.state(), &0);
    }

    #[test]
    fn limited_timemachine_evicts_oldest_frames() {
        let mut tm = TimeMachine::with_limit(0, 3);
        for v in 1..=5 {
            tm.record(v);
        }
        assert_eq!(tm.frame(), 5);

        tm.rewind(10);
        assert_eq!(tm.frame(), 3);
        assert_eq!(tm.state(), &3);
        tm.forward(10);
        assert_eq!(tm.state(), &5);
    }

    #[test]
    fn runner_steps_and_seeks() {
        let mut runner = HeadlessRunner::new(Additive);
        runner.run([1, 2, 3]);
        assert_eq!(runner.frame(), 3);
        assert_eq!(runner.state(), &6);

        runner.rewind(2);
        assert_eq!(runner.state(), &1);
        runner.forward(1);
        assert_eq!(runner.state(), &3);
    }

    #[test]
    fn step_profiled_reports_frame_to_profiler() {
        #[derive(Default)]
        struct Capture {
            frames: Vec<u64>,
        }

        impl Profiler for Capture {
            fn on_step(&mut self, frame: u64, timings: StepTimings) {
                assert!(timings.total >= timings.apply);
                self.frames.push(frame);
            }
        }

        let mut runner = HeadlessRunner::new(Additive);
        let mut capture = Capture::default();
        runner.step_profiled(4, &mut capture);
        runner.step_profiled(5, &mut capture);

        assert_eq!(capture.frames, vec![1, 2]);
        assert_eq!(runner.state(), &9);
    }
}
