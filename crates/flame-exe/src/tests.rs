use std::sync::Arc;

use proptest::prelude::*;

use flame_api::{AgentStatus, FlameContext};
use flame_mb::MessageBoardManager;
use flame_mem::AgentMemory;

use crate::builder::AgentTaskBuilder;
use crate::manager::TaskManager;
use crate::queue::SplitConfig;
use crate::scheduler::{QueueKind, Scheduler};
use crate::splitter::TaskSplitter;
use crate::task::{AgentTask, TaskKind};

fn circle_memory(n: usize) -> Arc<AgentMemory> {
    let mut mem = AgentMemory::new("Circle");
    mem.register_var::<i64>("x_int").unwrap();
    mem.register_var::<f64>("y_dbl").unwrap();
    mem.register_var::<f64>("z_dbl").unwrap();
    mem.hint_population(n);
    for i in 0..n {
        mem.get_vector::<i64>("x_int").unwrap().push(i as i64);
        mem.get_vector::<f64>("y_dbl").unwrap().push(0.0);
        mem.get_vector::<f64>("z_dbl").unwrap().push(0.0);
        mem.push_row_alive();
    }
    Arc::new(mem)
}

fn builder_for(
    name: &str,
    memory: &Arc<AgentMemory>,
    reads: &[&str],
    writes: &[&str],
    func: impl Fn(&FlameContext) -> flame_core::FlameResult<AgentStatus> + Send + Sync + 'static,
) -> AgentTask {
    let board_manager = Arc::new(MessageBoardManager::new());
    let mut b = AgentTaskBuilder::new(name, "Circle", Arc::clone(memory), board_manager, Arc::new(func));
    for r in reads {
        b.allow_access(r, false).unwrap();
    }
    for w in writes {
        b.allow_access(w, true).unwrap();
    }
    b.build()
}

// --- splitter (Scenario E) -------------------------------------------

fn splitter_task(n: usize) -> AgentTask {
    let memory = circle_memory(n);
    builder_for("split_probe", &memory, &["x_int"], &[], |_ctx| Ok(AgentStatus::Alive))
}

#[test]
fn scenario_e_four_even_subtasks() {
    let task = splitter_task(1000);
    let splitter = TaskSplitter::new();
    let subtasks = splitter.maybe_split(&task, 4, 100).unwrap().expect("should split");
    assert_eq!(subtasks.len(), 4);
    for s in &subtasks {
        assert_eq!(s.population_size().unwrap(), 1000);
    }
}

#[test]
fn scenario_e_two_subtasks_with_larger_min_vector_size() {
    let task = splitter_task(1000);
    let splitter = TaskSplitter::new();
    let subtasks = splitter.maybe_split(&task, 4, 400).unwrap().expect("should split");
    assert_eq!(subtasks.len(), 2);
}

#[test]
fn scenario_e_max_subtasks_one_means_no_split() {
    let task = splitter_task(1000);
    let splitter = TaskSplitter::new();
    let subtasks = splitter.maybe_split(&task, 1, 100).unwrap();
    assert!(subtasks.is_none());
}

#[test]
fn tiny_population_does_not_split() {
    let task = splitter_task(50);
    let splitter = TaskSplitter::new();
    let subtasks = splitter.maybe_split(&task, 4, 100).unwrap();
    assert!(subtasks.is_none());
}

proptest! {
    #[test]
    fn splitter_subtasks_cover_population_with_balanced_sizes(
        n in 1usize..5000,
        max_subtasks in 1usize..8,
        min_vector_size in 1usize..500,
    ) {
        let task = splitter_task(n);
        let splitter = TaskSplitter::new();
        if let Some(subtasks) = splitter.maybe_split(&task, max_subtasks, min_vector_size).unwrap() {
            prop_assert!(subtasks.len() >= 2);
            prop_assert!(subtasks.len() <= max_subtasks);
            let sizes: Vec<usize> = subtasks.iter().map(|s| s.row_count().unwrap()).collect();
            prop_assert_eq!(sizes.iter().sum::<usize>(), n, "subtasks must partition the full population");
            let min = *sizes.iter().min().unwrap();
            let max = *sizes.iter().max().unwrap();
            prop_assert!(max - min <= 1, "subtask sizes must differ by at most one row");
        }
    }
}

// --- builder ACL setup ---------------------------------------------------

#[test]
fn allow_message_post_on_unknown_board_is_invalid_argument() {
    let memory = circle_memory(1);
    let board_manager = Arc::new(MessageBoardManager::new());
    let mut b = AgentTaskBuilder::new(
        "poster",
        "Circle",
        memory,
        board_manager,
        Arc::new(|_ctx: &FlameContext| Ok(AgentStatus::Alive)),
    );
    let err = b.allow_message_post("nope").unwrap_err();
    assert!(matches!(err, flame_core::FlameError::InvalidArgument(_)));
}

#[test]
fn allow_message_read_on_unknown_board_is_invalid_argument() {
    let memory = circle_memory(1);
    let board_manager = Arc::new(MessageBoardManager::new());
    let mut b = AgentTaskBuilder::new(
        "reader",
        "Circle",
        memory,
        board_manager,
        Arc::new(|_ctx: &FlameContext| Ok(AgentStatus::Alive)),
    );
    let err = b.allow_message_read("nope").unwrap_err();
    assert!(matches!(err, flame_core::FlameError::InvalidArgument(_)));
}

#[test]
fn allow_message_post_on_registered_board_succeeds() {
    let memory = circle_memory(1);
    let board_manager = Arc::new(MessageBoardManager::new());
    board_manager.register_message::<i64>("locations").unwrap();
    let mut b = AgentTaskBuilder::new(
        "poster",
        "Circle",
        memory,
        board_manager,
        Arc::new(|_ctx: &FlameContext| Ok(AgentStatus::Alive)),
    );
    b.allow_message_post("locations").unwrap();
}

// --- split config -------------------------------------------------------

#[test]
fn split_config_ignores_unmarked_kinds() {
    let config = SplitConfig::default();
    assert!(config.params(TaskKind::AgentFunction).is_none());
}

#[test]
fn split_config_returns_configured_params() {
    let mut config = SplitConfig::default();
    config.set_splittable(TaskKind::AgentFunction);
    config.set_min_vector_size(TaskKind::AgentFunction, 100);
    config.set_max_tasks_per_split(TaskKind::AgentFunction, 4);
    assert_eq!(config.params(TaskKind::AgentFunction), Some((4, 100)));
}

// --- end-to-end scheduler: Scenario A -----------------------------------

#[test]
fn scenario_a_sequential_arithmetic_two_iterations() {
    let n = 5000;
    let memory = circle_memory(n);
    let board_manager = Arc::new(MessageBoardManager::new());

    let mut tasks = TaskManager::new();

    let t1 = builder_for("t1", &memory, &["x_int"], &["y_dbl"], |ctx| {
        let x: i64 = ctx.get_mem("x_int")?;
        ctx.set_mem("y_dbl", 10.0 * x as f64)?;
        Ok(AgentStatus::Alive)
    });
    let t2 = builder_for("t2", &memory, &["x_int"], &["z_dbl"], |ctx| {
        let x: i64 = ctx.get_mem("x_int")?;
        ctx.set_mem("z_dbl", x as f64 + 1.0)?;
        Ok(AgentStatus::Alive)
    });
    let t3 = builder_for("t3", &memory, &["x_int"], &["y_dbl"], |ctx| {
        let x: i64 = ctx.get_mem("x_int")?;
        let y: f64 = ctx.get_mem("y_dbl")?;
        ctx.set_mem("y_dbl", y + x as f64)?;
        Ok(AgentStatus::Alive)
    });
    let t4 = builder_for("t4", &memory, &["y_dbl", "z_dbl"], &["x_int"], |ctx| {
        let y: f64 = ctx.get_mem("y_dbl")?;
        let z: f64 = ctx.get_mem("z_dbl")?;
        ctx.set_mem("x_int", (y + z) as i64)?;
        Ok(AgentStatus::Alive)
    });

    tasks.add_agent_task(t1).unwrap();
    tasks.add_agent_task(t2).unwrap();
    tasks.add_agent_task(t3).unwrap();
    tasks.add_agent_task(t4).unwrap();
    tasks.add_dependency("t3", "t1").unwrap();
    tasks.add_dependency("t4", "t1").unwrap();
    tasks.add_dependency("t4", "t2").unwrap();
    tasks.add_dependency("t4", "t3").unwrap();

    let task_manager = Arc::new(tasks);
    let mut scheduler = Scheduler::new(Arc::clone(&task_manager), board_manager);
    let queue = scheduler.create_queue(QueueKind::Fifo, 4);
    scheduler.assign_type(queue, TaskKind::AgentFunction).unwrap();

    scheduler.run_iteration().unwrap();
    for i in 0..n {
        let x = memory.get_vector::<i64>("x_int").unwrap().get(i);
        let y = memory.get_vector::<f64>("y_dbl").unwrap().get(i);
        let z = memory.get_vector::<f64>("z_dbl").unwrap().get(i);
        assert_eq!(x, 12 * i as i64 + 1, "x mismatch at row {i}");
        assert_eq!(y, 11.0 * i as f64, "y mismatch at row {i}");
        assert_eq!(z, i as f64 + 1.0, "z mismatch at row {i}");
    }

    scheduler.run_iteration().unwrap();
    for i in 0..n {
        let x = memory.get_vector::<i64>("x_int").unwrap().get(i);
        let y = memory.get_vector::<f64>("y_dbl").unwrap().get(i);
        let z = memory.get_vector::<f64>("z_dbl").unwrap().get(i);
        assert_eq!(x, 144 * i as i64 + 13, "x mismatch at row {i}, iter 2");
        assert_eq!(y, 132.0 * i as f64 + 11.0, "y mismatch at row {i}, iter 2");
        assert_eq!(z, 12.0 * i as f64 + 2.0, "z mismatch at row {i}, iter 2");
    }

    scheduler.shutdown();
}

// --- splitting scheduler integration ------------------------------------

#[test]
fn splitting_queue_runs_full_population_exactly_once_per_row() {
    let n = 1000;
    let memory = circle_memory(n);
    let board_manager = Arc::new(MessageBoardManager::new());

    let mut tasks = TaskManager::new();
    let t1 = builder_for("t1", &memory, &["x_int"], &["y_dbl"], |ctx| {
        let x: i64 = ctx.get_mem("x_int")?;
        ctx.set_mem("y_dbl", x as f64 * 2.0)?;
        Ok(AgentStatus::Alive)
    });
    tasks.add_agent_task(t1).unwrap();

    let task_manager = Arc::new(tasks);
    let mut scheduler = Scheduler::new(Arc::clone(&task_manager), board_manager);
    let queue = scheduler.create_queue(QueueKind::SplittingFifo, 4);
    scheduler.assign_type(queue, TaskKind::AgentFunction).unwrap();
    scheduler.set_splittable(TaskKind::AgentFunction);
    scheduler.set_min_vector_size(TaskKind::AgentFunction, 100);
    scheduler.set_max_tasks_per_split(TaskKind::AgentFunction, 4);

    scheduler.run_iteration().unwrap();

    for i in 0..n {
        let y = memory.get_vector::<f64>("y_dbl").unwrap().get(i);
        assert_eq!(y, i as f64 * 2.0, "row {i} should be touched exactly once");
    }

    scheduler.shutdown();
}

#[test]
fn scheduler_propagates_first_task_error() {
    let memory = circle_memory(10);
    let board_manager = Arc::new(MessageBoardManager::new());

    let mut tasks = TaskManager::new();
    let failing = builder_for("fails", &memory, &["x_int"], &[], |_ctx| {
        Err(flame_core::FlameError::LogicError("boom".into()))
    });
    tasks.add_agent_task(failing).unwrap();

    let task_manager = Arc::new(tasks);
    let mut scheduler = Scheduler::new(Arc::clone(&task_manager), board_manager);
    let queue = scheduler.create_queue(QueueKind::Fifo, 2);
    scheduler.assign_type(queue, TaskKind::AgentFunction).unwrap();

    let result = scheduler.run_iteration();
    assert!(result.is_err());
    scheduler.shutdown();
}

#[test]
fn scheduler_propagates_first_task_error_with_undispatched_dependent() {
    // A dependent of the failing task must never be released, and
    // `run_iteration` must still return rather than blocking forever
    // waiting for a `TaskDone` that will never arrive for it.
    let memory = circle_memory(10);
    let board_manager = Arc::new(MessageBoardManager::new());

    let mut tasks = TaskManager::new();
    let failing = builder_for("fails", &memory, &["x_int"], &[], |_ctx| {
        Err(flame_core::FlameError::LogicError("boom".into()))
    });
    let dependent = builder_for("never_runs", &memory, &["x_int"], &[], |_ctx| Ok(AgentStatus::Alive));
    tasks.add_agent_task(failing).unwrap();
    tasks.add_agent_task(dependent).unwrap();
    tasks.add_dependency("never_runs", "fails").unwrap();

    let task_manager = Arc::new(tasks);
    let mut scheduler = Scheduler::new(Arc::clone(&task_manager), board_manager);
    let queue = scheduler.create_queue(QueueKind::Fifo, 2);
    scheduler.assign_type(queue, TaskKind::AgentFunction).unwrap();

    let result = scheduler.run_iteration();
    assert!(result.is_err());
    scheduler.shutdown();
}
