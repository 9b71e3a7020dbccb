// Fakes for exercising wayvk without a GPU or input devices
//
// FakeProvider models the parts of Vulkan synchronization the frame
// pipeline depends on, and panics on misuse that would be undefined
// behavior or a hang on real hardware.
use crate::input::{InputSource, KeyEvent, KeyState, RawKey};
use crate::session::{Session, SessionState};
use crate::surface::{Acquire, FrameContent, Presented, SurfaceProvider};
use utils::{anyhow, Result};

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// Work the fake GPU hasn't finished yet
struct Submission {
    fence: usize,
    cbuf: usize,
}

pub struct FakeProvider {
    /// signaled state of every fence
    pub fences: Vec<bool>,
    /// signaled state of every semaphore
    pub semas: Vec<bool>,
    /// command buffers referenced by unfinished work
    pub cbufs_busy: Vec<bool>,
    queue: VecDeque<Submission>,
    /// Results handed out by acquire before falling back to cycling
    /// through the images
    pub acquire_script: VecDeque<Acquire>,
    pub present_script: VecDeque<Presented>,
    next_image: u32,
    pub image_count: u32,
    pub recorded: Vec<FrameContent>,
    pub presented: Vec<u32>,
    pub acquires: usize,
    pub recreates: usize,
    pub max_in_flight: usize,
    /// Shared so it can still be read after the provider is dropped
    pub destroyed: Rc<Cell<usize>>,
    /// Mirrors the number of unfinished submissions, for sessions to
    /// look at during cleanup
    pub in_flight_probe: Rc<Cell<usize>>,
    /// Fail the next submit
    pub fail_submit: bool,
    /// Acquire reports OutOfDate until the swapchain is recreated, like
    /// a real swapchain after a mode change
    pub out_of_date: bool,
    /// wait_fence returns without the GPU having finished anything
    pub wait_returns_early: bool,
}

impl FakeProvider {
    pub fn new(image_count: u32) -> Self {
        Self {
            fences: Vec::new(),
            semas: Vec::new(),
            cbufs_busy: Vec::new(),
            queue: VecDeque::new(),
            acquire_script: VecDeque::new(),
            present_script: VecDeque::new(),
            next_image: 0,
            image_count: image_count,
            recorded: Vec::new(),
            presented: Vec::new(),
            acquires: 0,
            recreates: 0,
            max_in_flight: 0,
            destroyed: Rc::new(Cell::new(0)),
            in_flight_probe: Rc::new(Cell::new(0)),
            fail_submit: false,
            out_of_date: false,
            wait_returns_early: false,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.queue.len()
    }

    /// Finish GPU work in submission order, up to and including `fence`
    fn complete_until(&mut self, fence: usize) {
        while let Some(sub) = self.queue.pop_front() {
            self.fences[sub.fence] = true;
            self.cbufs_busy[sub.cbuf] = false;
            if sub.fence == fence {
                break;
            }
        }
        self.in_flight_probe.set(self.queue.len());
    }
}

impl SurfaceProvider for FakeProvider {
    type Fence = usize;
    type Semaphore = usize;
    type CommandBuffer = usize;

    fn create_fence(&mut self) -> Result<usize> {
        self.fences.push(true);
        Ok(self.fences.len() - 1)
    }

    fn destroy_fence(&mut self, fence: usize) {
        assert!(
            !self.queue.iter().any(|s| s.fence == fence),
            "fence destroyed while in use"
        );
        self.destroyed.set(self.destroyed.get() + 1);
    }

    fn create_semaphore(&mut self) -> Result<usize> {
        self.semas.push(false);
        Ok(self.semas.len() - 1)
    }

    fn destroy_semaphore(&mut self, _sema: usize) {
        self.destroyed.set(self.destroyed.get() + 1);
    }

    fn create_command_buffer(&mut self) -> Result<usize> {
        self.cbufs_busy.push(false);
        Ok(self.cbufs_busy.len() - 1)
    }

    fn destroy_command_buffer(&mut self, cbuf: usize) {
        assert!(!self.cbufs_busy[cbuf], "command buffer destroyed while in use");
        self.destroyed.set(self.destroyed.get() + 1);
    }

    fn wait_fence(&mut self, fence: usize) -> Result<()> {
        if self.fences[fence] || self.wait_returns_early {
            return Ok(());
        }
        assert!(
            self.queue.iter().any(|s| s.fence == fence),
            "waiting on fence {} which nothing will signal, this hangs",
            fence
        );
        self.complete_until(fence);
        Ok(())
    }

    fn reset_fence(&mut self, fence: usize) -> Result<()> {
        self.fences[fence] = false;
        Ok(())
    }

    fn fence_signaled(&self, fence: usize) -> Result<bool> {
        Ok(self.fences[fence])
    }

    fn acquire(&mut self, _timeout_ns: u64, sema: usize) -> Result<Acquire> {
        self.acquires += 1;
        if self.out_of_date {
            return Ok(Acquire::OutOfDate);
        }
        let res = match self.acquire_script.pop_front() {
            Some(res) => res,
            None => {
                let image = self.next_image;
                self.next_image = (self.next_image + 1) % self.image_count;
                Acquire::Image(image)
            }
        };

        if let Acquire::Image(_) | Acquire::Suboptimal(_) = res {
            assert!(!self.semas[sema], "acquire semaphore {} already signaled", sema);
            self.semas[sema] = true;
        }
        Ok(res)
    }

    fn record(&mut self, cbuf: usize, image: u32, content: &FrameContent) -> Result<()> {
        assert!(
            !self.cbufs_busy[cbuf],
            "command buffer {} rewritten while its frame is in flight",
            cbuf
        );
        assert!(image < self.image_count);
        self.recorded.push(*content);
        Ok(())
    }

    fn submit(&mut self, cbuf: usize, wait: usize, _signal: usize, fence: usize) -> Result<()> {
        if self.fail_submit {
            return Err(anyhow!("device lost"));
        }
        assert!(self.semas[wait], "submit waits on an unsignaled semaphore");
        assert!(!self.fences[fence], "submit with a signaled fence");
        self.semas[wait] = false;
        self.cbufs_busy[cbuf] = true;
        self.queue.push_back(Submission {
            fence: fence,
            cbuf: cbuf,
        });
        self.max_in_flight = self.max_in_flight.max(self.queue.len());
        self.in_flight_probe.set(self.queue.len());
        Ok(())
    }

    fn present(&mut self, image: u32, _wait: usize) -> Result<Presented> {
        self.presented.push(image);
        Ok(self.present_script.pop_front().unwrap_or(Presented::Optimal))
    }

    fn recreate(&mut self) -> Result<()> {
        assert!(self.queue.is_empty(), "swapchain recreated with frames in flight");
        self.recreates += 1;
        self.next_image = 0;
        self.out_of_date = false;
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<()> {
        if let Some(last) = self.queue.back().map(|s| s.fence) {
            self.complete_until(last);
        }
        Ok(())
    }

    fn image_count(&self) -> u32 {
        self.image_count
    }

    fn extent(&self) -> (u32, u32) {
        (640, 480)
    }
}

/// Every lifecycle call a RecordingSession saw
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Setup(&'static str),
    Shown(&'static str),
    Hidden(&'static str),
    Update(&'static str),
    Background(&'static str),
    Key(&'static str, KeyEvent),
    Draw(&'static str),
    /// with the number of frames in flight at the time
    Cleanup(&'static str, usize),
}

pub type Journal = Rc<RefCell<Vec<Call>>>;

pub fn journal() -> Journal {
    Rc::new(RefCell::new(Vec::new()))
}

/// A session that writes everything that happens to it to a journal
pub struct RecordingSession {
    pub name: &'static str,
    pub journal: Journal,
    pub background: bool,
    pub fail_setup: bool,
    pub probe: Option<Rc<Cell<usize>>>,
}

impl RecordingSession {
    pub fn new(name: &'static str, journal: &Journal) -> Self {
        Self {
            name: name,
            journal: journal.clone(),
            background: false,
            fail_setup: false,
            probe: None,
        }
    }

    pub fn with_background(mut self) -> Self {
        self.background = true;
        self
    }

    pub fn boxed(self) -> Box<dyn Session> {
        Box::new(self)
    }
}

impl Session for RecordingSession {
    fn name(&self) -> &str {
        self.name
    }

    fn setup(&self) -> Result<Box<dyn SessionState>> {
        if self.fail_setup {
            return Err(anyhow!("{} refused to start", self.name));
        }
        self.journal.borrow_mut().push(Call::Setup(self.name));

        Ok(Box::new(RecordingState {
            name: self.name,
            journal: self.journal.clone(),
            background: self.background,
            probe: self.probe.clone(),
        }))
    }
}

struct RecordingState {
    name: &'static str,
    journal: Journal,
    background: bool,
    probe: Option<Rc<Cell<usize>>>,
}

impl RecordingState {
    fn log(&self, call: Call) {
        self.journal.borrow_mut().push(call);
    }
}

impl SessionState for RecordingState {
    fn shown(&mut self) {
        self.log(Call::Shown(self.name));
    }

    fn hidden(&mut self) {
        self.log(Call::Hidden(self.name));
    }

    fn update(&mut self) {
        self.log(Call::Update(self.name));
    }

    fn key_event(&mut self, ev: &KeyEvent) {
        self.log(Call::Key(self.name, *ev));
    }

    fn draw(&mut self, _content: &mut FrameContent) {
        self.log(Call::Draw(self.name));
    }

    fn supports_background_update(&self) -> bool {
        self.background
    }

    fn background_update(&mut self) {
        self.log(Call::Background(self.name));
    }

    fn cleanup(self: Box<Self>) {
        let in_flight = self.probe.as_ref().map(|p| p.get()).unwrap_or(0);
        self.log(Call::Cleanup(self.name, in_flight));
    }
}

/// Count the journal entries matching `pred`
pub fn count<F: Fn(&Call) -> bool>(journal: &Journal, pred: F) -> usize {
    journal.borrow().iter().filter(|c| pred(c)).count()
}

/// Hands out one batch of records per poll
pub struct ScriptedInput {
    si_batches: VecDeque<Vec<RawKey>>,
    si_polls: usize,
}

impl ScriptedInput {
    pub fn new(batches: Vec<Vec<RawKey>>) -> Self {
        Self {
            si_batches: batches.into(),
            si_polls: 0,
        }
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self, out: &mut Vec<RawKey>) -> Result<()> {
        self.si_polls += 1;
        assert!(self.si_polls < 10_000, "input script never quit");
        if let Some(batch) = self.si_batches.pop_front() {
            out.extend(batch);
        }
        Ok(())
    }
}

pub fn press(key: u32) -> RawKey {
    RawKey {
        time: 0,
        key: key,
        state: KeyState::Pressed,
    }
}

pub fn release(key: u32) -> RawKey {
    RawKey {
        time: 0,
        key: key,
        state: KeyState::Released,
    }
}
