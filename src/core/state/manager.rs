//=========================================================================
// State Manager
//=========================================================================
//
// Owns the state stack and schedules it.
//
// Architecture:
//   stack: Vec<Box<dyn GameState>>   index 0 = bottom, last = top
//
//   push/pop/replace  → lifecycle hooks → recalculate()
//   recalculate()     → hidden flags (top-down) + shared fps ceiling
//   update()          → mailbox, then top-down until !update_states_behind
//   render()          → bottom-up over visible states
//   flush()           → queued transitions, then pop ended tops
//
// Direct calls (`push_state`, `pop_state`, `replace_state`) are for code
// outside the stack: application setup and tests. States go through the
// `StateContext`, whose requests are applied at `flush()`.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, trace, warn};

//=== Internal Dependencies ===============================================

use super::context::{StackServices, StateContext};
use super::governor::{FpsCounter, FpsGovernor};
use super::message_box::MessageBoxState;
use super::transition_queue::Transition;
use super::{GameState, StateId, StateKind};
use crate::core::clock::{Clock, SystemClock};
use crate::core::config::SchedulerConfig;
use crate::core::error::StateError;
use crate::core::input::{KeyCode, Modifiers, MouseButton};
use crate::core::messaging::{Envelope, Message, MessageTarget};
use crate::core::render::Renderer;

//=== Constants ===========================================================

/// Bound on transition rounds applied by one flush. A state that keeps
/// queuing transitions from its own `enter()` would otherwise spin.
const MAX_FLUSH_ROUNDS: usize = 32;

//=== StateManager ========================================================

/// Hierarchical game-state scheduler.
///
/// # Example
///
/// ```rust
/// use stratum_engine::core::state::{GameState, StateCore, StateFlags, StateManager};
/// use stratum_engine::core::config::SchedulerConfig;
///
/// struct Menu { core: StateCore }
///
/// impl GameState for Menu {
///     fn core(&self) -> &StateCore { &self.core }
///     fn core_mut(&mut self) -> &mut StateCore { &mut self.core }
/// }
///
/// let mut manager = StateManager::new(SchedulerConfig::default());
/// manager.push_state(Box::new(Menu { core: StateCore::new("menu", StateFlags::OPAQUE) }));
/// assert_eq!(manager.number_of_states(), 1);
/// ```
pub struct StateManager {
    stack: Vec<Box<dyn GameState>>,
    services: StackServices,
    config: SchedulerConfig,
    clock: Arc<dyn Clock>,
    next_id: u64,

    update_gate: FpsGovernor,
    render_gate: FpsGovernor,
    max_update_fps: u32,
    max_render_fps: u32,
    max_fps: u32,
    update_counter: FpsCounter,
    render_counter: FpsCounter,

    has_focus: bool,
    is_visible: bool,
}

impl StateManager {
    //--- Construction -----------------------------------------------------

    /// Creates an empty manager driven by the system clock.
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Creates an empty manager driven by `clock`.
    pub fn with_clock(config: SchedulerConfig, clock: Arc<dyn Clock>) -> Self {
        let floor = config.min_fps.max(1);
        Self {
            stack: Vec::new(),
            services: StackServices::default(),
            config,
            clock,
            next_id: 1,
            update_gate: FpsGovernor::new(floor),
            render_gate: FpsGovernor::new(floor),
            max_update_fps: floor,
            max_render_fps: floor,
            max_fps: floor,
            update_counter: FpsCounter::new(),
            render_counter: FpsCounter::new(),
            has_focus: true,
            is_visible: true,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    //--- Stack Operations -------------------------------------------------

    /// Pushes `state` on top of the stack and enters it.
    ///
    /// The previous top receives `leave_after_push()` first.
    pub fn push_state(&mut self, mut state: Box<dyn GameState>) -> StateId {
        let now = self.clock.now();

        if let Some(top) = self.stack.last_mut() {
            let id = top.core().id();
            let mut ctx = StateContext::new(&mut self.services, &self.config, id, now, false);
            top.leave_after_push(&mut ctx);
        }

        let id = self.allocate_id();
        state.core_mut().assign_id(id);
        debug!(target: "states", "Push {} {} (depth {})", state.core().name(), id, self.stack.len() + 1);

        self.stack.push(state);
        self.enter_at(self.stack.len() - 1, now);
        self.recalculate();
        id
    }

    /// Pops the top state and hands it back to the caller.
    ///
    /// The popped state receives `leave()`, the new top receives
    /// `enter_after_pop()`.
    pub fn pop_state(&mut self) -> Option<Box<dyn GameState>> {
        let now = self.clock.now();

        let Some(top) = self.stack.last_mut() else {
            warn!(target: "states", "Pop requested on an empty stack");
            return None;
        };

        let id = top.core().id();
        let mut ctx = StateContext::new(&mut self.services, &self.config, id, now, true);
        top.leave(&mut ctx);

        let state = self.stack.pop()?;
        debug!(target: "states", "Pop {} {} (depth {})", state.core().name(), id, self.stack.len());

        if let Some(new_top) = self.stack.last_mut() {
            let id = new_top.core().id();
            let mut ctx = StateContext::new(&mut self.services, &self.config, id, now, true);
            new_top.enter_after_pop(&mut ctx);
        }

        self.recalculate();
        Some(state)
    }

    /// Replaces the top state with `state`, returning the previous top.
    ///
    /// Neither `enter_after_pop()` nor `leave_after_push()` is called. On
    /// an empty stack this is a push.
    pub fn replace_state(&mut self, state: Box<dyn GameState>) -> Option<Box<dyn GameState>> {
        match self.stack.last() {
            Some(top) => {
                let target = top.core().id();
                self.replace_state_by_id(target, state).ok()
            }
            None => {
                self.push_state(state);
                None
            }
        }
    }

    /// Replaces the state `target`, wherever it sits in the stack.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::NoSuchState`] if `target` is not on the stack;
    /// `state` is dropped in that case.
    pub fn replace_state_by_id(
        &mut self,
        target: StateId,
        mut state: Box<dyn GameState>,
    ) -> Result<Box<dyn GameState>, StateError> {
        let position = self.position_of(target).ok_or(StateError::NoSuchState(target))?;
        let now = self.clock.now();
        let is_top = position + 1 == self.stack.len();

        {
            let old = &mut self.stack[position];
            let mut ctx = StateContext::new(&mut self.services, &self.config, target, now, is_top);
            old.leave(&mut ctx);
        }

        state.core_mut().assign_id(target);
        let previous = std::mem::replace(&mut self.stack[position], state);
        debug!(
            target: "states",
            "Replace {} {} with {}",
            previous.core().name(),
            target,
            self.stack[position].core().name()
        );

        self.enter_at(position, now);
        self.recalculate();
        Ok(previous)
    }

    /// Applies queued transitions, then pops every top state that has
    /// requested its end. Returns the states that left the stack.
    ///
    /// Raises the quit flag when the stack ends up empty.
    pub fn flush(&mut self) -> Vec<Box<dyn GameState>> {
        let mut retired = Vec::new();

        for round in 0.. {
            if round == MAX_FLUSH_ROUNDS {
                warn!(
                    target: "states",
                    "Flush gave up after {} rounds, {} transitions deferred",
                    MAX_FLUSH_ROUNDS,
                    self.services.transitions.len()
                );
                break;
            }

            for transition in self.services.transitions.take() {
                self.apply(transition, &mut retired);
            }

            while self.top_requested_end() {
                if let Some(state) = self.pop_state() {
                    retired.push(state);
                }
            }

            if self.services.transitions.is_empty() {
                break;
            }
        }

        if self.stack.is_empty() && !self.services.quit_requested {
            info!(target: "states", "State stack is empty, requesting application end");
            self.services.quit_requested = true;
        }

        retired
    }

    //--- Frame Hooks ------------------------------------------------------

    /// Delivers pending messages, then updates states from the top down.
    ///
    /// Stops after the first state that does not update the states behind
    /// it. Gated by the shared update rate; skipped without focus unless
    /// the top state asks to keep running.
    pub fn update(&mut self) {
        let now = self.clock.now();

        if !self.has_focus && !self.stack.last().is_some_and(|s| s.update_when_invisible()) {
            return;
        }
        if !self.update_gate.ready(now) {
            return;
        }

        self.dispatch_messages(now);

        let depth = self.stack.len();
        for (index, state) in self.stack.iter_mut().enumerate().rev() {
            let id = state.core().id();
            let mut ctx = StateContext::new(&mut self.services, &self.config, id, now, index + 1 == depth);

            if let Err(err) = state.update(&mut ctx) {
                recover(&mut ctx, state.core().name(), err);
            }

            if !state.core().update_states_behind() {
                break;
            }
        }

        self.update_counter.tick(now);
    }

    /// Renders every visible state from the bottom up.
    pub fn render(&mut self, renderer: &mut dyn Renderer) {
        let now = self.clock.now();

        if !self.is_visible || !self.render_gate.ready(now) {
            return;
        }

        let clear = self
            .stack
            .first()
            .map_or(true, |bottom| bottom.core().draw_states_behind());
        renderer.begin_frame(clear);

        let depth = self.stack.len();
        for (index, state) in self.stack.iter_mut().enumerate() {
            if state.core().is_hidden() {
                continue;
            }

            let id = state.core().id();
            let mut ctx = StateContext::new(&mut self.services, &self.config, id, now, index + 1 == depth);
            if let Err(err) = state.render(&mut ctx, renderer) {
                recover(&mut ctx, state.core().name(), err);
            }
        }

        if self.config.show_fps {
            renderer.draw_text(&format!(
                "u: {} fps / r: {} fps (max {})",
                self.update_counter.current(),
                self.render_counter.current(),
                self.max_fps
            ));
        }

        if self.config.debug_stack {
            for state in self.stack.iter().rev() {
                let core = state.core();
                renderer.draw_text(&format!(
                    "{} {}{}",
                    core.id(),
                    core.name(),
                    if core.is_hidden() { " (hidden)" } else { "" }
                ));
            }
        }

        if self.stack.last().is_some_and(|top| top.core().show_cursor()) {
            renderer.draw_cursor();
        }

        renderer.end_frame();

        for (index, state) in self.stack.iter_mut().enumerate() {
            if state.core().is_hidden() {
                continue;
            }
            let id = state.core().id();
            let mut ctx = StateContext::new(&mut self.services, &self.config, id, now, index + 1 == depth);
            state.on_render_flush(&mut ctx);
        }

        self.render_counter.tick(now);
    }

    //--- Input Routing ----------------------------------------------------
    //
    // Input goes to the top state only, and is dropped while a queued
    // transition or an end request would change that top at the next flush.

    pub fn key_down(&mut self, key: KeyCode, modifiers: Modifiers, character: Option<char>) {
        self.dispatch_to_top(|state, ctx| state.key_down(ctx, key, modifiers, character));
    }

    pub fn key_up(&mut self, key: KeyCode, modifiers: Modifiers) {
        self.dispatch_to_top(|state, ctx| state.key_up(ctx, key, modifiers));
    }

    pub fn mouse_down(&mut self, button: MouseButton) {
        self.dispatch_to_top(|state, ctx| state.mouse_down(ctx, button));
    }

    pub fn mouse_double_click(&mut self, button: MouseButton) {
        self.dispatch_to_top(|state, ctx| state.mouse_double_click(ctx, button));
    }

    pub fn mouse_up(&mut self, button: MouseButton) {
        self.dispatch_to_top(|state, ctx| state.mouse_up(ctx, button));
    }

    //--- Messaging --------------------------------------------------------

    /// Queues `message` for delivery at the start of the next update.
    pub fn send_asynchronous_message(&mut self, message: Message, target: MessageTarget) {
        self.services.mailbox.post(message, target);
    }

    /// Delivers `message` now to every state observing its kind.
    pub fn send_synchronous_message(&mut self, message: Message) {
        let now = self.clock.now();
        self.deliver(
            Envelope {
                target: MessageTarget::Broadcast,
                message,
            },
            now,
        );
    }

    //--- Visibility & Frame Rate ------------------------------------------

    /// Recomputes which states are hidden.
    ///
    /// Walking from the top, every state strictly below the first state
    /// that does not draw the states behind it is hidden.
    pub fn calculate_which_state_is_rendered(&mut self) {
        let mut hide = false;
        for state in self.stack.iter_mut().rev() {
            state.core_mut().set_hidden(hide);
            if !state.core().draw_states_behind() {
                hide = true;
            }
        }
    }

    /// Recomputes the shared update/render ceilings and informs every
    /// state of the resulting loop rate.
    pub fn calculate_fps(&mut self) {
        let floor = self.config.min_fps.max(1);

        let mut update_fps = floor;
        for state in self.stack.iter().rev() {
            update_fps = update_fps.max(state.core().update_fps());
            if !state.core().update_states_behind() {
                break;
            }
        }

        let render_fps = self
            .stack
            .iter()
            .filter(|state| !state.core().is_hidden())
            .map(|state| state.core().render_fps())
            .fold(floor, u32::max);

        self.max_update_fps = update_fps;
        self.max_render_fps = render_fps;
        self.max_fps = update_fps.max(render_fps);
        self.update_gate.set_fps(update_fps);
        self.render_gate.set_fps(render_fps);

        let max_fps = self.max_fps;
        for state in self.stack.iter_mut() {
            state.core_mut().set_max_fps(max_fps);
        }
    }

    /// Loop rate the frame limiter should target.
    pub fn max_fps(&self) -> u32 {
        self.max_fps
    }

    pub fn max_update_fps(&self) -> u32 {
        self.max_update_fps
    }

    pub fn max_render_fps(&self) -> u32 {
        self.max_render_fps
    }

    /// Updates performed during the last full second.
    pub fn current_update_fps(&self) -> u32 {
        self.update_counter.current()
    }

    /// Frames rendered during the last full second.
    pub fn current_render_fps(&self) -> u32 {
        self.render_counter.current()
    }

    pub fn change_focus(&mut self, has_focus: bool) {
        if self.has_focus != has_focus {
            debug!(target: "states", "Focus changed: {}", has_focus);
        }
        self.has_focus = has_focus;
    }

    pub fn change_visibility(&mut self, is_visible: bool) {
        if self.is_visible != is_visible {
            debug!(target: "states", "Visibility changed: {}", is_visible);
        }
        self.is_visible = is_visible;
    }

    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    pub fn is_visible(&self) -> bool {
        self.is_visible
    }

    /// Whether the loop has anything to do this tick.
    pub fn need_update_or_render(&self) -> bool {
        self.is_visible
            || self.has_focus
            || self.stack.iter().any(|state| state.update_when_invisible())
    }

    //--- Queries ----------------------------------------------------------

    pub fn number_of_states(&self) -> usize {
        self.stack.len()
    }

    pub fn is_top_of_the_states(&self, id: StateId) -> bool {
        self.stack.last().is_some_and(|top| top.core().id() == id)
    }

    pub fn is_there_a_such_state(&self, name: &str) -> bool {
        self.stack.iter().any(|state| state.core().name() == name)
    }

    pub fn is_there_a_such_state_kind(&self, kind: StateKind) -> bool {
        self.stack.iter().any(|state| state.kind() == kind)
    }

    pub fn top(&self) -> Option<&dyn GameState> {
        self.stack.last().map(|state| state.as_ref())
    }

    pub fn find(&self, id: StateId) -> Option<&dyn GameState> {
        self.stack
            .iter()
            .find(|state| state.core().id() == id)
            .map(|state| state.as_ref())
    }

    /// States from bottom to top.
    pub fn states(&self) -> impl Iterator<Item = &dyn GameState> + '_ {
        self.stack.iter().map(|state| state.as_ref())
    }

    /// Whether some state asked the application to end.
    pub fn quit_requested(&self) -> bool {
        self.services.quit_requested
    }

    /// Asks the application to end after this tick.
    pub fn request_quit(&mut self) {
        self.services.quit_requested = true;
    }

    pub fn pending_messages(&self) -> usize {
        self.services.mailbox.len()
    }

    pub fn pending_transitions(&self) -> usize {
        self.services.transitions.len()
    }

    //--- Teardown ---------------------------------------------------------

    /// Destroys the per-state-type resources.
    pub fn clean_states(&mut self) {
        self.services.resources.shutdown();
    }

    /// Pops every state, delivering the messages each pop produces to the
    /// states still resident, then cleans the per-state resources.
    ///
    /// Every state goes through `leave()` exactly once, so a message box
    /// torn down here still answers its receiver.
    pub fn shutdown(&mut self) {
        info!(target: "states", "Shutting down {} states", self.stack.len());

        while self.pop_state().is_some() {
            let now = self.clock.now();
            self.dispatch_messages(now);
        }

        let dropped_messages = self.services.mailbox.len();
        let dropped_transitions = self.services.transitions.len();
        if dropped_messages + dropped_transitions > 0 {
            debug!(
                target: "states",
                "Dropping {} messages and {} transitions at shutdown",
                dropped_messages,
                dropped_transitions
            );
        }
        self.services.mailbox.clear();
        self.services.transitions.clear();

        self.clean_states();
    }

    //--- Internal Helpers -------------------------------------------------

    fn allocate_id(&mut self) -> StateId {
        let id = StateId::from_raw(self.next_id);
        self.next_id += 1;
        id
    }

    fn position_of(&self, id: StateId) -> Option<usize> {
        self.stack.iter().position(|state| state.core().id() == id)
    }

    fn top_requested_end(&self) -> bool {
        self.stack.last().is_some_and(|top| top.core().request_for_end())
    }

    fn recalculate(&mut self) {
        self.calculate_which_state_is_rendered();
        self.calculate_fps();
    }

    fn enter_at(&mut self, position: usize, now: Duration) {
        let is_top = position + 1 == self.stack.len();
        let state = &mut self.stack[position];
        let id = state.core().id();
        let mut ctx = StateContext::new(&mut self.services, &self.config, id, now, is_top);

        if let Err(err) = state.enter(&mut ctx) {
            recover(&mut ctx, state.core().name(), err);
        }
    }

    fn apply(&mut self, transition: Transition, retired: &mut Vec<Box<dyn GameState>>) {
        match transition {
            Transition::Push(state) => {
                self.push_state(state);
            }
            Transition::Pop => retired.extend(self.pop_state()),
            Transition::Replace { target, state } => {
                match self.replace_state_by_id(target, state) {
                    Ok(previous) => retired.push(previous),
                    Err(err) => warn!(target: "states", "Dropping replacement: {}", err),
                }
            }
        }
    }

    fn dispatch_to_top<F>(&mut self, f: F)
    where
        F: FnOnce(&mut dyn GameState, &mut StateContext<'_>),
    {
        let now = self.clock.now();
        let Some(top) = self.stack.last_mut() else {
            return;
        };

        // Input belongs to whichever state is on top after the next flush.
        if !self.services.transitions.is_empty() || top.core().request_for_end() {
            trace!(target: "states", "Input dropped, stack change pending for {}", top.core().name());
            return;
        }

        let id = top.core().id();
        let mut ctx = StateContext::new(&mut self.services, &self.config, id, now, true);
        f(top.as_mut(), &mut ctx);
    }

    fn dispatch_messages(&mut self, now: Duration) {
        for envelope in self.services.mailbox.take() {
            self.deliver(envelope, now);
        }
    }

    fn deliver(&mut self, envelope: Envelope, now: Duration) {
        let Envelope { target, message } = envelope;
        let depth = self.stack.len();

        match target {
            MessageTarget::State(id) => {
                let Some(index) = self.position_of(id) else {
                    warn!(target: "states", "Dropping {:?}: no state {}", message.kind(), id);
                    return;
                };

                let state = &mut self.stack[index];
                let mut ctx = StateContext::new(&mut self.services, &self.config, id, now, index + 1 == depth);
                if let Err(err) = state.on_message(&mut ctx, message) {
                    recover(&mut ctx, state.core().name(), err);
                }
            }
            MessageTarget::Broadcast => {
                let kind = message.kind();
                for (index, state) in self.stack.iter_mut().enumerate() {
                    if !state.observes(kind) {
                        continue;
                    }
                    let id = state.core().id();
                    let mut ctx = StateContext::new(&mut self.services, &self.config, id, now, index + 1 == depth);
                    if let Err(err) = state.on_message(&mut ctx, message.clone()) {
                        recover(&mut ctx, state.core().name(), err);
                    }
                }
            }
        }
    }
}

//=== Error Recovery ======================================================

/// Replaces the state behind `ctx` with an error box.
fn recover(ctx: &mut StateContext<'_>, name: &str, err: StateError) {
    error!(target: "states", "State {} {} failed: {}", name, ctx.id(), err);
    let target = ctx.id();
    ctx.replace(target, Box::new(MessageBoxState::error(err.to_string())));
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::core::messaging::{MessageKind, MsgBoxButton, MsgBoxButtons, MsgBoxId};
    use crate::core::render::{DrawCall, RecordingRenderer};
    use crate::core::state::{BoxPhase, StateContext, StateCore, StateFlags};
    use std::sync::Mutex;

    //--- Test Helpers -----------------------------------------------------

    type Journal = Arc<Mutex<Vec<String>>>;

    /// State that records every hook into a shared journal.
    struct Tracked {
        core: StateCore,
        journal: Journal,
        fail_enter: bool,
        observes: Option<MessageKind>,
    }

    impl Tracked {
        fn new(name: &'static str, flags: StateFlags, journal: &Journal) -> Self {
            Self {
                core: StateCore::new(name, flags),
                journal: journal.clone(),
                fail_enter: false,
                observes: None,
            }
        }

        fn log(&self, event: &str) {
            self.journal
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.core.name(), event));
        }
    }

    impl GameState for Tracked {
        fn core(&self) -> &StateCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut StateCore {
            &mut self.core
        }

        fn enter(&mut self, _ctx: &mut StateContext<'_>) -> Result<(), StateError> {
            self.log("enter");
            if self.fail_enter {
                return Err(StateError::Simulation("boom".into()));
            }
            Ok(())
        }

        fn leave(&mut self, _ctx: &mut StateContext<'_>) {
            self.log("leave");
        }

        fn enter_after_pop(&mut self, _ctx: &mut StateContext<'_>) {
            self.log("enter_after_pop");
        }

        fn leave_after_push(&mut self, _ctx: &mut StateContext<'_>) {
            self.log("leave_after_push");
        }

        fn update(&mut self, _ctx: &mut StateContext<'_>) -> Result<(), StateError> {
            self.log("update");
            Ok(())
        }

        fn render(
            &mut self,
            _ctx: &mut StateContext<'_>,
            _renderer: &mut dyn Renderer,
        ) -> Result<(), StateError> {
            self.log("render");
            Ok(())
        }

        fn key_down(
            &mut self,
            ctx: &mut StateContext<'_>,
            key: KeyCode,
            _modifiers: Modifiers,
            _character: Option<char>,
        ) {
            self.log(&format!("key {:?}", key));
            if key == KeyCode::Escape {
                self.core.request_end();
            }
            if key == KeyCode::KeyQ {
                let receiver = ctx.id();
                ctx.push(
                    MessageBoxState::new(MsgBoxId::Quit, "Quit ?", MsgBoxButtons::YES_NO)
                        .with_receiver(receiver),
                );
            }
        }

        fn on_message(
            &mut self,
            _ctx: &mut StateContext<'_>,
            message: Message,
        ) -> Result<(), StateError> {
            self.log(&format!("message {:?}", message));
            Ok(())
        }

        fn observes(&self, kind: MessageKind) -> bool {
            self.observes == Some(kind)
        }
    }

    struct Harness {
        manager: StateManager,
        clock: Arc<ManualClock>,
        journal: Journal,
    }

    impl Harness {
        fn new() -> Self {
            let clock = Arc::new(ManualClock::new());
            Self {
                manager: StateManager::with_clock(SchedulerConfig::default(), clock.clone()),
                clock,
                journal: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn tracked(&self, name: &'static str, flags: StateFlags) -> Tracked {
            Tracked::new(name, flags, &self.journal)
        }

        fn push(&mut self, name: &'static str, flags: StateFlags) -> StateId {
            let tracked = self.tracked(name, flags);
            self.manager.push_state(Box::new(tracked))
        }

        fn take_journal(&self) -> Vec<String> {
            std::mem::take(&mut *self.journal.lock().unwrap())
        }

        /// Advances time past every gate and runs one update.
        fn tick_update(&mut self) {
            self.clock.advance_ms(20);
            self.manager.update();
        }

        fn tick_render(&mut self) -> RecordingRenderer {
            self.clock.advance_ms(20);
            let mut renderer = RecordingRenderer::new();
            self.manager.render(&mut renderer);
            renderer
        }

        fn hidden(&self) -> Vec<bool> {
            self.manager.states().map(|s| s.core().is_hidden()).collect()
        }
    }

    //--- Push / Pop / Replace ---------------------------------------------

    #[test]
    fn push_calls_leave_after_push_then_enter() {
        let mut h = Harness::new();
        h.push("a", StateFlags::OPAQUE);
        h.push("b", StateFlags::OPAQUE);

        assert_eq!(h.take_journal(), vec!["a:enter", "a:leave_after_push", "b:enter"]);
        assert_eq!(h.manager.number_of_states(), 2);
    }

    #[test]
    fn push_assigns_unique_ids() {
        let mut h = Harness::new();
        let a = h.push("a", StateFlags::OPAQUE);
        let b = h.push("b", StateFlags::OPAQUE);
        assert_ne!(a, b);
        assert!(h.manager.is_top_of_the_states(b));
        assert!(!h.manager.is_top_of_the_states(a));
    }

    #[test]
    fn pop_calls_leave_then_enter_after_pop() {
        let mut h = Harness::new();
        h.push("a", StateFlags::OPAQUE);
        h.push("b", StateFlags::OPAQUE);
        h.take_journal();

        let popped = h.manager.pop_state().unwrap();

        assert_eq!(popped.core().name(), "b");
        assert_eq!(h.take_journal(), vec!["b:leave", "a:enter_after_pop"]);
    }

    #[test]
    fn pop_on_empty_stack_returns_none() {
        let mut h = Harness::new();
        assert!(h.manager.pop_state().is_none());
    }

    #[test]
    fn replace_keeps_id_and_skips_resume_hooks() {
        let mut h = Harness::new();
        h.push("a", StateFlags::OPAQUE);
        let b = h.push("b", StateFlags::OPAQUE);
        h.take_journal();

        let c = h.tracked("c", StateFlags::OPAQUE);
        let previous = h.manager.replace_state(Box::new(c)).unwrap();

        assert_eq!(previous.core().name(), "b");
        assert_eq!(h.take_journal(), vec!["b:leave", "c:enter"]);
        assert_eq!(h.manager.top().unwrap().core().id(), b);
        assert_eq!(h.manager.number_of_states(), 2);
    }

    #[test]
    fn replace_by_unknown_id_fails() {
        let mut h = Harness::new();
        h.push("a", StateFlags::OPAQUE);
        let c = h.tracked("c", StateFlags::OPAQUE);

        match h.manager.replace_state_by_id(StateId::from_raw(99), Box::new(c)) {
            Err(err) => assert_eq!(err, StateError::NoSuchState(StateId::from_raw(99))),
            Ok(_) => panic!("replacing an unknown id must fail"),
        }
    }

    //--- Visibility -------------------------------------------------------

    #[test]
    fn states_below_first_opaque_are_hidden() {
        let mut h = Harness::new();
        h.push("a", StateFlags::OPAQUE);
        h.push("b", StateFlags::TRANSPARENT);
        h.push("c", StateFlags::OPAQUE);
        h.push("d", StateFlags::OVERLAY);

        assert_eq!(h.hidden(), vec![true, true, false, false]);

        h.manager.pop_state();
        h.manager.pop_state();
        assert_eq!(h.hidden(), vec![false, false]);
    }

    //--- Update Traversal -------------------------------------------------

    #[test]
    fn update_stops_after_first_state_not_updating_behind() {
        let mut h = Harness::new();
        h.push("a", StateFlags::OPAQUE);
        h.push("b", StateFlags::OVERLAY);
        h.push("c", StateFlags::TRANSPARENT);
        h.take_journal();

        h.tick_update();

        assert_eq!(h.take_journal(), vec!["c:update", "b:update"]);
    }

    #[test]
    fn update_is_gated_by_shared_rate() {
        let mut h = Harness::new();
        h.push("a", StateFlags::OPAQUE);
        h.take_journal();

        h.manager.update();
        h.manager.update();
        h.clock.advance_ms(5);
        h.manager.update();

        assert_eq!(h.take_journal(), vec!["a:update"]);
    }

    #[test]
    fn update_skipped_without_focus() {
        let mut h = Harness::new();
        h.push("a", StateFlags::OPAQUE);
        h.take_journal();

        h.manager.change_focus(false);
        h.tick_update();
        assert!(h.take_journal().is_empty());

        h.manager.change_focus(true);
        h.tick_update();
        assert_eq!(h.take_journal(), vec!["a:update"]);
    }

    //--- Render Traversal -------------------------------------------------

    #[test]
    fn render_walks_bottom_up_skipping_hidden() {
        let mut h = Harness::new();
        h.push("a", StateFlags::OPAQUE);
        h.push("b", StateFlags::OPAQUE);
        h.push("c", StateFlags::OVERLAY);
        h.take_journal();

        let renderer = h.tick_render();

        assert_eq!(h.take_journal(), vec!["b:render", "c:render"]);
        assert_eq!(renderer.calls().first(), Some(&DrawCall::BeginFrame { clear: false }));
        assert_eq!(renderer.calls().last(), Some(&DrawCall::EndFrame));
    }

    #[test]
    fn render_skipped_while_invisible() {
        let mut h = Harness::new();
        h.push("a", StateFlags::OPAQUE);
        h.take_journal();
        h.manager.change_visibility(false);

        let renderer = h.tick_render();

        assert!(renderer.calls().is_empty());
        assert!(h.take_journal().is_empty());
    }

    #[test]
    fn debug_overlay_lists_stack() {
        let clock = Arc::new(ManualClock::new());
        let config = SchedulerConfig {
            debug_stack: true,
            ..SchedulerConfig::default()
        };
        let journal: Journal = Arc::new(Mutex::new(Vec::new()));
        let mut manager = StateManager::with_clock(config, clock);
        manager.push_state(Box::new(Tracked::new("a", StateFlags::OPAQUE, &journal)));

        let mut renderer = RecordingRenderer::new();
        manager.render(&mut renderer);

        assert!(renderer.calls().contains(&DrawCall::Text("#1 a".into())));
    }

    //--- Frame Rate -------------------------------------------------------

    #[test]
    fn max_fps_has_floor() {
        let mut h = Harness::new();
        h.push("a", StateFlags::OPAQUE);
        assert_eq!(h.manager.max_fps(), 50);
    }

    #[test]
    fn fast_state_raises_ceiling_until_frozen() {
        let mut h = Harness::new();
        let fast = h.tracked("fast", StateFlags::OPAQUE);
        h.manager.push_state(Box::new(Tracked {
            core: StateCore::new("fast", StateFlags::OPAQUE).with_update_fps(100),
            ..fast
        }));
        assert_eq!(h.manager.max_update_fps(), 100);
        assert_eq!(h.manager.max_fps(), 100);

        h.push("overlay", StateFlags::OVERLAY);
        assert_eq!(h.manager.max_update_fps(), 50);
        assert_eq!(h.manager.max_fps(), 50);
        assert!(h.manager.states().all(|s| s.core().max_fps() == 50));

        h.manager.pop_state();
        assert_eq!(h.manager.max_fps(), 100);
    }

    #[test]
    fn render_ceiling_ignores_hidden_states() {
        let mut h = Harness::new();
        let base = h.tracked("base", StateFlags::OPAQUE);
        h.manager.push_state(Box::new(Tracked {
            core: StateCore::new("base", StateFlags::OPAQUE).with_render_fps(120),
            ..base
        }));
        assert_eq!(h.manager.max_render_fps(), 120);

        h.push("menu", StateFlags::OPAQUE);
        assert_eq!(h.manager.max_render_fps(), 50);
    }

    //--- Flush ------------------------------------------------------------

    #[test]
    fn flush_pops_states_requesting_end() {
        let mut h = Harness::new();
        h.push("a", StateFlags::OPAQUE);
        h.push("b", StateFlags::OPAQUE);
        h.manager.key_down(KeyCode::Escape, Modifiers::NONE, None);

        assert_eq!(h.manager.number_of_states(), 2);
        let retired = h.manager.flush();

        assert_eq!(retired.len(), 1);
        assert_eq!(retired[0].core().name(), "b");
        assert_eq!(h.manager.number_of_states(), 1);
        assert!(!h.manager.quit_requested());
    }

    #[test]
    fn flush_without_requests_is_noop() {
        let mut h = Harness::new();
        h.push("a", StateFlags::OPAQUE);
        assert!(h.manager.flush().is_empty());
        assert_eq!(h.manager.number_of_states(), 1);
    }

    #[test]
    fn emptying_the_stack_requests_quit() {
        let mut h = Harness::new();
        h.push("a", StateFlags::OPAQUE);
        h.manager.key_down(KeyCode::Escape, Modifiers::NONE, None);
        h.manager.flush();

        assert_eq!(h.manager.number_of_states(), 0);
        assert!(h.manager.quit_requested());
    }

    #[test]
    fn input_reaches_top_only() {
        let mut h = Harness::new();
        h.push("a", StateFlags::OPAQUE);
        h.push("b", StateFlags::TRANSPARENT);
        h.take_journal();

        h.manager.key_down(KeyCode::KeyA, Modifiers::NONE, Some('a'));

        assert_eq!(h.take_journal(), vec!["b:key KeyA"]);
    }

    #[test]
    fn repeated_input_before_flush_pushes_once() {
        let mut h = Harness::new();
        h.push("pause", StateFlags::OVERLAY);
        h.take_journal();

        h.manager.key_down(KeyCode::KeyQ, Modifiers::NONE, None);
        h.manager.key_up(KeyCode::KeyQ, Modifiers::NONE);
        h.manager.key_down(KeyCode::KeyQ, Modifiers::NONE, None);
        h.manager.flush();

        let names: Vec<_> = h.manager.states().map(|s| s.core().name()).collect();
        assert_eq!(names, vec!["pause", "message_box"]);
        assert_eq!(
            h.take_journal().iter().filter(|e| e.as_str() == "pause:key KeyQ").count(),
            1
        );
    }

    #[test]
    fn input_after_end_request_is_dropped() {
        let mut h = Harness::new();
        h.push("a", StateFlags::OPAQUE);
        h.push("b", StateFlags::OPAQUE);
        h.take_journal();

        h.manager.key_down(KeyCode::Escape, Modifiers::NONE, None);
        h.manager.key_down(KeyCode::KeyA, Modifiers::NONE, Some('a'));

        assert_eq!(h.take_journal(), vec!["b:key Escape"]);
        h.manager.flush();
        h.manager.key_down(KeyCode::KeyA, Modifiers::NONE, Some('a'));
        assert_eq!(h.take_journal(), vec!["b:leave", "a:enter_after_pop", "a:key KeyA"]);
    }

    #[test]
    fn failing_enter_is_replaced_by_error_box() {
        let mut h = Harness::new();
        h.push("a", StateFlags::OPAQUE);
        let mut broken = h.tracked("broken", StateFlags::OPAQUE);
        broken.fail_enter = true;
        let id = h.manager.push_state(Box::new(broken));

        h.manager.flush();

        let top = h.manager.top().unwrap();
        assert_eq!(top.core().name(), "message_box");
        assert_eq!(top.core().id(), id);
        assert_eq!(h.manager.number_of_states(), 2);
    }

    //--- Messaging --------------------------------------------------------

    #[test]
    fn message_box_answer_arrives_once_after_pop() {
        let mut h = Harness::new();
        h.push("pause", StateFlags::OVERLAY);
        h.manager.key_down(KeyCode::KeyQ, Modifiers::NONE, None);
        h.manager.flush();
        assert_eq!(h.manager.top().unwrap().core().name(), "message_box");
        h.take_journal();

        h.manager.key_down(KeyCode::Enter, Modifiers::NONE, None);
        h.tick_update();
        assert!(h.take_journal().iter().all(|e| !e.starts_with("pause:message")));

        h.manager.flush();
        assert_eq!(h.manager.number_of_states(), 1);
        assert_eq!(h.take_journal(), vec!["pause:enter_after_pop"]);

        h.tick_update();
        h.tick_update();
        let messages: Vec<_> = h
            .take_journal()
            .into_iter()
            .filter(|e| e.starts_with("pause:message"))
            .collect();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Yes"));
    }

    #[test]
    fn broadcast_reaches_observers_only() {
        let mut h = Harness::new();
        let mut listener = h.tracked("listener", StateFlags::OPAQUE);
        listener.observes = Some(MessageKind::ProfileChanged);
        h.manager.push_state(Box::new(listener));
        h.push("other", StateFlags::TRANSPARENT);
        h.take_journal();

        h.manager
            .send_asynchronous_message(Message::ProfileChanged, MessageTarget::Broadcast);
        assert!(h.take_journal().is_empty());

        h.tick_update();
        let journal = h.take_journal();
        assert!(journal.contains(&"listener:message ProfileChanged".to_string()));
        assert!(!journal.iter().any(|e| e.starts_with("other:message")));
    }

    #[test]
    fn synchronous_message_is_immediate() {
        let mut h = Harness::new();
        let mut listener = h.tracked("listener", StateFlags::OPAQUE);
        listener.observes = Some(MessageKind::LevelsUpdated);
        h.manager.push_state(Box::new(listener));
        h.take_journal();

        h.manager.send_synchronous_message(Message::LevelsUpdated);

        assert_eq!(h.take_journal(), vec!["listener:message LevelsUpdated"]);
    }

    #[test]
    fn message_to_missing_state_is_dropped() {
        let mut h = Harness::new();
        h.push("a", StateFlags::OPAQUE);
        h.take_journal();

        h.manager.send_asynchronous_message(
            Message::Restart,
            MessageTarget::State(StateId::from_raw(42)),
        );
        h.tick_update();

        assert_eq!(h.take_journal(), vec!["a:update"]);
        assert_eq!(h.manager.pending_messages(), 0);
    }

    //--- Shutdown ---------------------------------------------------------

    #[test]
    fn shutdown_drives_open_box_through_leave_once() {
        let mut h = Harness::new();
        h.push("pause", StateFlags::OVERLAY);
        h.manager.key_down(KeyCode::KeyQ, Modifiers::NONE, None);
        h.manager.flush();
        h.take_journal();

        h.manager.shutdown();

        let journal = h.take_journal();
        let deliveries: Vec<_> = journal.iter().filter(|e| e.contains("message")).collect();
        assert_eq!(deliveries.len(), 1);
        assert!(deliveries[0].contains("Nothing"));
        assert_eq!(journal.last().map(String::as_str), Some("pause:leave"));
        assert_eq!(h.manager.number_of_states(), 0);
    }

    #[test]
    fn box_phase_reported_by_public_state() {
        let mut state = MessageBoxState::error("x");
        state.click(MsgBoxButton::Ok);
        assert_eq!(state.phase(), BoxPhase::Closing);
    }

    //--- Queries ----------------------------------------------------------

    #[test]
    fn stack_queries() {
        let mut h = Harness::new();
        let a = h.push("a", StateFlags::OPAQUE);
        h.manager.push_state(Box::new(MessageBoxState::error("x")));

        assert!(h.manager.is_there_a_such_state("a"));
        assert!(!h.manager.is_there_a_such_state("zzz"));
        assert!(h.manager.is_there_a_such_state_kind(StateKind::Overlay));
        assert!(!h.manager.is_there_a_such_state_kind(StateKind::Scene));
        assert_eq!(h.manager.find(a).map(|s| s.core().name()), Some("a"));
    }

    #[test]
    fn need_update_or_render_when_hidden_and_unfocused() {
        let mut h = Harness::new();
        h.push("a", StateFlags::OPAQUE);
        h.manager.change_focus(false);
        h.manager.change_visibility(false);
        assert!(!h.manager.need_update_or_render());

        h.manager.change_visibility(true);
        assert!(h.manager.need_update_or_render());
    }

    //--- Stack Properties -------------------------------------------------

    mod properties {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum StackOp {
            Push {
                flags: StateFlags,
                update_fps: u32,
                render_fps: u32,
            },
            Pop,
        }

        fn stack_op() -> impl Strategy<Value = StackOp> {
            let flags = prop_oneof![
                Just(StateFlags::OPAQUE),
                Just(StateFlags::OVERLAY),
                Just(StateFlags::TRANSPARENT),
            ];
            prop_oneof![
                3 => (flags, 1u32..=200, 1u32..=200).prop_map(|(flags, update_fps, render_fps)| {
                    StackOp::Push {
                        flags,
                        update_fps,
                        render_fps,
                    }
                }),
                2 => Just(StackOp::Pop),
            ]
        }

        /// What the stack should hold, bottom first.
        struct Expected {
            id: StateId,
            flags: StateFlags,
            update_fps: u32,
            render_fps: u32,
        }

        fn check_stack(h: &Harness, model: &[Expected]) -> Result<(), TestCaseError> {
            let ids: Vec<StateId> = h.manager.states().map(|s| s.core().id()).collect();
            prop_assert_eq!(h.manager.number_of_states(), model.len());
            prop_assert_eq!(ids, model.iter().map(|e| e.id).collect::<Vec<_>>());

            // Hidden exactly when something above does not draw behind.
            let hidden: Vec<bool> = (0..model.len())
                .map(|i| model[i + 1..].iter().any(|e| !e.flags.draw_states_behind))
                .collect();
            prop_assert_eq!(h.hidden(), hidden.clone());

            let floor = SchedulerConfig::default().min_fps;
            let mut update_fps = floor;
            for e in model.iter().rev() {
                update_fps = update_fps.max(e.update_fps);
                if !e.flags.update_states_behind {
                    break;
                }
            }
            let render_fps = model
                .iter()
                .zip(&hidden)
                .filter(|(_, hidden)| !**hidden)
                .map(|(e, _)| e.render_fps)
                .fold(floor, u32::max);

            prop_assert_eq!(h.manager.max_update_fps(), update_fps);
            prop_assert_eq!(h.manager.max_render_fps(), render_fps);
            prop_assert_eq!(h.manager.max_fps(), update_fps.max(render_fps));
            for state in h.manager.states() {
                prop_assert_eq!(state.core().max_fps(), h.manager.max_fps());
            }
            Ok(())
        }

        proptest! {
            #[test]
            fn nested_push_pop_keeps_stack_consistent(
                ops in proptest::collection::vec(stack_op(), 1..48)
            ) {
                let mut h = Harness::new();
                let mut model: Vec<Expected> = Vec::new();

                for op in ops {
                    match op {
                        StackOp::Push { flags, update_fps, render_fps } => {
                            let mut state = h.tracked("s", flags);
                            state.core = StateCore::new("s", flags)
                                .with_update_fps(update_fps)
                                .with_render_fps(render_fps);
                            let id = h.manager.push_state(Box::new(state));
                            model.push(Expected { id, flags, update_fps, render_fps });
                        }
                        StackOp::Pop => {
                            let expected = model.pop().map(|e| e.id);
                            let popped = h.manager.pop_state().map(|s| s.core().id());
                            prop_assert_eq!(popped, expected);
                            prop_assert_eq!(
                                h.manager.top().map(|s| s.core().id()),
                                model.last().map(|e| e.id)
                            );
                        }
                    }
                    check_stack(&h, &model)?;
                }
            }
        }
    }
}
