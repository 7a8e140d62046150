//! Microtask-batched job scheduling.
//!
//! Passive effects and other jobs are queued here and coalesced into a single
//! flush that runs one microtask after the synchronous code that queued them.
//!
//! The runtime has no event loop of its own. A host installs a
//! [`MicrotaskHook`] (in the browser, typically
//! `wasm_bindgen_futures::spawn_local`); without one, queued microtasks wait
//! for [`Scheduler::run_microtasks`], which native hosts and tests call as
//! their "tick".

use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use futures::channel::oneshot;

use crate::effect;
use crate::runtime::{NodeId, with_runtime};

/// A unit of deferred work
pub type Microtask = Box<dyn FnOnce() + 'static>;

/// Host integration point that runs a microtask after the current synchronous turn
pub type MicrotaskHook = Rc<dyn Fn(Microtask) + 'static>;

/// Default runaway guard for a single flush
pub const DEFAULT_MAX_FLUSH_ITERATIONS: usize = 10_000;

#[derive(Clone)]
enum JobKind {
	Effect,
	Callback(Rc<dyn Fn() + 'static>),
}

/// A queued job, identified by id for set-semantics enqueueing
#[derive(Clone)]
pub struct Job {
	id: NodeId,
	kind: JobKind,
}

impl Job {
	/// Wrap a callback in a job with a fresh identity
	///
	/// Clones of the returned job share the identity, so enqueueing a clone
	/// twice before a flush runs it once.
	pub fn new<F>(f: F) -> Self
	where
		F: Fn() + 'static,
	{
		Self {
			id: NodeId::new(),
			kind: JobKind::Callback(Rc::new(f)),
		}
	}

	/// A job that re-runs the effect with the given id
	pub fn effect(effect_id: NodeId) -> Self {
		Self {
			id: effect_id,
			kind: JobKind::Effect,
		}
	}

	/// Identity used for deduplication
	pub fn id(&self) -> NodeId {
		self.id
	}

	fn run(&self) {
		match &self.kind {
			JobKind::Effect => {
				effect::execute_effect(self.id);
			}
			JobKind::Callback(f) => {
				if catch_unwind(AssertUnwindSafe(|| f())).is_err() {
					tracing::error!(job = ?self.id, "scheduled job panicked");
				}
			}
		}
	}
}

/// Job queue with a single pending flush, plus the microtask queue
pub struct Scheduler {
	queue: RefCell<VecDeque<Job>>,
	queued: RefCell<HashSet<NodeId>>,
	flush_pending: Cell<bool>,
	microtasks: RefCell<VecDeque<Microtask>>,
	hook: RefCell<Option<MicrotaskHook>>,
	max_flush_iterations: Cell<usize>,
}

impl Scheduler {
	/// Create an empty scheduler
	pub fn new() -> Self {
		Self {
			queue: RefCell::new(VecDeque::new()),
			queued: RefCell::new(HashSet::new()),
			flush_pending: Cell::new(false),
			microtasks: RefCell::new(VecDeque::new()),
			hook: RefCell::new(None),
			max_flush_iterations: Cell::new(DEFAULT_MAX_FLUSH_ITERATIONS),
		}
	}

	/// Install (or remove) the host microtask hook
	pub fn set_microtask_hook(&self, hook: Option<MicrotaskHook>) {
		*self.hook.borrow_mut() = hook;
	}

	/// Set the runaway guard: the number of jobs a single flush may run
	pub fn set_max_flush_iterations(&self, max: usize) {
		self.max_flush_iterations.set(max.max(1));
	}

	/// Queue `task` to run after the current synchronous execution completes
	pub fn schedule_microtask<F>(&self, task: F)
	where
		F: FnOnce() + 'static,
	{
		let hook = self.hook.borrow().clone();
		match hook {
			Some(hook) => hook(Box::new(task)),
			None => self.microtasks.borrow_mut().push_back(Box::new(task)),
		}
	}

	/// Run queued microtasks until the queue is empty
	///
	/// Microtasks queued while draining run in the same call. Returns the
	/// number of microtasks executed.
	pub fn run_microtasks(&self) -> usize {
		let mut count = 0;
		loop {
			let task = self.microtasks.borrow_mut().pop_front();
			let Some(task) = task else {
				break;
			};
			count += 1;
			if catch_unwind(AssertUnwindSafe(task)).is_err() {
				tracing::error!("microtask panicked");
			}
		}
		count
	}

	/// Number of microtasks waiting for [`run_microtasks`](Self::run_microtasks)
	pub fn pending_microtasks(&self) -> usize {
		self.microtasks.borrow().len()
	}

	/// Add `job` to the pending set and arm a flush if none is pending
	///
	/// Enqueueing a job id that is already queued is a no-op.
	pub fn enqueue_job(&self, job: Job) {
		if !self.queued.borrow_mut().insert(job.id) {
			return;
		}
		self.queue.borrow_mut().push_back(job);

		if !self.flush_pending.replace(true) {
			self.schedule_microtask(|| with_runtime(|rt| rt.scheduler().flush()));
		}
	}

	/// Whether a flush has been armed and not yet completed
	pub fn is_flush_pending(&self) -> bool {
		self.flush_pending.get()
	}

	/// Number of jobs waiting for the next flush
	pub fn pending_jobs(&self) -> usize {
		self.queue.borrow().len()
	}

	/// Drain the queue in insertion order until it is empty
	///
	/// Jobs enqueued by running jobs are drained in the same flush. The
	/// pending flag is reset once the queue is empty.
	pub fn flush(&self) {
		let max = self.max_flush_iterations.get();
		let mut iterations = 0usize;

		loop {
			let job = self.queue.borrow_mut().pop_front();
			let Some(job) = job else {
				break;
			};
			self.queued.borrow_mut().remove(&job.id);

			iterations += 1;
			if iterations > max {
				tracing::error!(
					max_iterations = max,
					"flush exceeded its iteration budget; dropping remaining jobs"
				);
				self.queue.borrow_mut().clear();
				self.queued.borrow_mut().clear();
				break;
			}
			job.run();
		}

		self.flush_pending.set(false);
	}
}

impl Default for Scheduler {
	fn default() -> Self {
		Self::new()
	}
}

/// Queue a microtask on the thread's scheduler
pub fn schedule_microtask<F>(task: F)
where
	F: FnOnce() + 'static,
{
	with_runtime(|rt| rt.scheduler().schedule_microtask(task));
}

/// Enqueue a job on the thread's scheduler
pub fn enqueue_job(job: Job) {
	with_runtime(|rt| rt.scheduler().enqueue_job(job));
}

/// Run `f` on the next tick, after any flush already queued
pub fn next_tick<F>(f: F)
where
	F: FnOnce() + 'static,
{
	schedule_microtask(f);
}

/// A future that resolves on the next tick
pub fn next_tick_future() -> impl Future<Output = ()> {
	let (tx, rx) = oneshot::channel::<()>();
	schedule_microtask(move || {
		let _ = tx.send(());
	});
	async move {
		let _ = rx.await;
	}
}

/// Run queued microtasks on the thread's scheduler until none are left
///
/// This is the native host's tick.
pub fn run_microtasks() -> usize {
	with_runtime(|rt| rt.scheduler().run_microtasks())
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::cell::RefCell;

	#[rstest]
	fn test_microtask_runs_after_sync_code() {
		let log = Rc::new(RefCell::new(Vec::new()));
		let l = log.clone();

		schedule_microtask(move || l.borrow_mut().push("microtask"));
		log.borrow_mut().push("sync");
		run_microtasks();

		assert_eq!(*log.borrow(), vec!["sync", "microtask"]);
	}

	#[rstest]
	fn test_same_job_enqueued_twice_runs_once() {
		let count = Rc::new(Cell::new(0));
		let c = count.clone();
		let job = Job::new(move || c.set(c.get() + 1));

		enqueue_job(job.clone());
		enqueue_job(job.clone());
		enqueue_job(job);
		run_microtasks();

		assert_eq!(count.get(), 1);
	}

	#[rstest]
	fn test_flush_preserves_enqueue_order() {
		let log = Rc::new(RefCell::new(Vec::new()));
		for n in 0..4 {
			let l = log.clone();
			enqueue_job(Job::new(move || l.borrow_mut().push(n)));
		}

		with_runtime(|rt| {
			assert_eq!(rt.scheduler().pending_jobs(), 4);
			assert!(rt.scheduler().is_flush_pending());
		});
		run_microtasks();

		assert_eq!(*log.borrow(), vec![0, 1, 2, 3]);
		assert!(!with_runtime(|rt| rt.scheduler().is_flush_pending()));
	}

	#[rstest]
	fn test_flush_drains_jobs_enqueued_during_flush() {
		let log = Rc::new(RefCell::new(Vec::new()));
		let l = log.clone();
		enqueue_job(Job::new(move || {
			l.borrow_mut().push("outer");
			let inner = l.clone();
			enqueue_job(Job::new(move || inner.borrow_mut().push("inner")));
		}));

		let ran = run_microtasks();

		assert_eq!(*log.borrow(), vec!["outer", "inner"]);
		// One flush microtask covered both jobs.
		assert_eq!(ran, 1);
	}

	#[rstest]
	fn test_runaway_flush_is_cut_off() {
		with_runtime(|rt| rt.scheduler().set_max_flush_iterations(50));
		let count = Rc::new(Cell::new(0));

		fn requeue(count: Rc<Cell<usize>>) {
			let c = count.clone();
			enqueue_job(Job::new(move || {
				c.set(c.get() + 1);
				requeue(c.clone());
			}));
		}
		requeue(count.clone());
		run_microtasks();

		assert_eq!(count.get(), 50);
		with_runtime(|rt| {
			assert_eq!(rt.scheduler().pending_jobs(), 0);
			rt.scheduler().set_max_flush_iterations(DEFAULT_MAX_FLUSH_ITERATIONS);
		});
	}

	#[rstest]
	fn test_microtask_hook_receives_tasks() {
		let captured: Rc<RefCell<Vec<Microtask>>> = Rc::new(RefCell::new(Vec::new()));
		let sink = captured.clone();
		with_runtime(|rt| {
			rt.scheduler()
				.set_microtask_hook(Some(Rc::new(move |task| sink.borrow_mut().push(task))))
		});

		let ran = Rc::new(Cell::new(false));
		let r = ran.clone();
		schedule_microtask(move || r.set(true));
		assert_eq!(run_microtasks(), 0);

		with_runtime(|rt| rt.scheduler().set_microtask_hook(None));
		for task in captured.borrow_mut().drain(..) {
			task();
		}
		assert!(ran.get());
	}

	#[rstest]
	fn test_next_tick_future_resolves_after_tick() {
		let done = Rc::new(Cell::new(false));
		let d = done.clone();
		let fut = next_tick_future();

		run_microtasks();
		futures::executor::block_on(async move {
			fut.await;
			d.set(true);
		});

		assert!(done.get());
	}
}
