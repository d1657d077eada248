//! circles — smallest runnable FLAME2 host program.
//!
//! Reproduces the two canonical scenarios: sequential per-agent arithmetic
//! across a dependency chain (Scenario A), and a post → sync → read → clear
//! message round trip (Scenario B).

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tracing::info;

use flame_api::{AgentStatus, FlameContext};
use flame_exe::{AgentTaskBuilder, BoardOp, QueueKind, Scheduler, TaskKind, TaskManager};
use flame_mb::MessageBoardManager;
use flame_mem::AgentMemory;

const ARITHMETIC_POPULATION: usize = 5000;
const MESSAGE_POPULATION: usize = 100;

#[derive(Debug, Clone)]
struct LocationMessage {
    id: i64,
}

fn run_arithmetic_scenario() -> Result<()> {
    let mut memory = AgentMemory::new("Circle");
    memory.register_var::<i64>("x_int")?;
    memory.register_var::<f64>("y_dbl")?;
    memory.register_var::<f64>("z_dbl")?;
    memory.hint_population(ARITHMETIC_POPULATION);
    for i in 0..ARITHMETIC_POPULATION {
        memory.get_vector::<i64>("x_int")?.push(i as i64);
        memory.get_vector::<f64>("y_dbl")?.push(0.0);
        memory.get_vector::<f64>("z_dbl")?.push(0.0);
        memory.push_row_alive();
    }
    let memory = Arc::new(memory);
    let board_manager = Arc::new(MessageBoardManager::new());

    let mut tasks = TaskManager::new();

    let mut t1 = AgentTaskBuilder::new(
        "t1",
        "Circle",
        Arc::clone(&memory),
        Arc::clone(&board_manager),
        Arc::new(|ctx: &FlameContext| {
            let x: i64 = ctx.get_mem("x_int")?;
            ctx.set_mem("y_dbl", 10.0 * x as f64)?;
            Ok(AgentStatus::Alive)
        }),
    );
    t1.allow_access("x_int", false)?;
    t1.allow_access("y_dbl", true)?;

    let mut t2 = AgentTaskBuilder::new(
        "t2",
        "Circle",
        Arc::clone(&memory),
        Arc::clone(&board_manager),
        Arc::new(|ctx: &FlameContext| {
            let x: i64 = ctx.get_mem("x_int")?;
            ctx.set_mem("z_dbl", x as f64 + 1.0)?;
            Ok(AgentStatus::Alive)
        }),
    );
    t2.allow_access("x_int", false)?;
    t2.allow_access("z_dbl", true)?;

    let mut t3 = AgentTaskBuilder::new(
        "t3",
        "Circle",
        Arc::clone(&memory),
        Arc::clone(&board_manager),
        Arc::new(|ctx: &FlameContext| {
            let x: i64 = ctx.get_mem("x_int")?;
            let y: f64 = ctx.get_mem("y_dbl")?;
            ctx.set_mem("y_dbl", y + x as f64)?;
            Ok(AgentStatus::Alive)
        }),
    );
    t3.allow_access("x_int", false)?;
    t3.allow_access("y_dbl", true)?;

    let mut t4 = AgentTaskBuilder::new(
        "t4",
        "Circle",
        Arc::clone(&memory),
        Arc::clone(&board_manager),
        Arc::new(|ctx: &FlameContext| {
            let y: f64 = ctx.get_mem("y_dbl")?;
            let z: f64 = ctx.get_mem("z_dbl")?;
            ctx.set_mem("x_int", (y + z) as i64)?;
            Ok(AgentStatus::Alive)
        }),
    );
    t4.allow_access("y_dbl", false)?;
    t4.allow_access("z_dbl", false)?;
    t4.allow_access("x_int", true)?;

    tasks.add_agent_task(t1.build())?;
    tasks.add_agent_task(t2.build())?;
    tasks.add_agent_task(t3.build())?;
    tasks.add_agent_task(t4.build())?;
    tasks.add_dependency("t3", "t1")?;
    tasks.add_dependency("t4", "t1")?;
    tasks.add_dependency("t4", "t2")?;
    tasks.add_dependency("t4", "t3")?;

    let task_manager = Arc::new(tasks);
    let mut scheduler = Scheduler::new(Arc::clone(&task_manager), board_manager);
    let queue = scheduler.create_queue(QueueKind::SplittingFifo, 4);
    scheduler.assign_type(queue, TaskKind::AgentFunction)?;
    scheduler.set_splittable(TaskKind::AgentFunction);
    scheduler.set_min_vector_size(TaskKind::AgentFunction, 500);
    scheduler.set_max_tasks_per_split(TaskKind::AgentFunction, 4);

    let t0 = Instant::now();
    scheduler.run_iteration()?;
    scheduler.run_iteration()?;
    info!(elapsed = ?t0.elapsed(), "arithmetic scenario ran two iterations");
    scheduler.shutdown();

    let x0 = memory.get_vector::<i64>("x_int")?.get(1);
    let y0 = memory.get_vector::<f64>("y_dbl")?.get(1);
    let z0 = memory.get_vector::<f64>("z_dbl")?.get(1);
    println!("after 2 iterations, agent 1: x={x0} (want 157), y={y0} (want 143), z={z0} (want 14)");

    Ok(())
}

fn run_message_scenario() -> Result<()> {
    let mut memory = AgentMemory::new("Circle");
    memory.register_var::<i64>("id")?;
    memory.register_var::<i64>("checksum")?;
    memory.hint_population(MESSAGE_POPULATION);
    for i in 0..MESSAGE_POPULATION {
        memory.get_vector::<i64>("id")?.push(i as i64);
        memory.get_vector::<i64>("checksum")?.push(0);
        memory.push_row_alive();
    }
    let memory = Arc::new(memory);

    let board_manager = Arc::new(MessageBoardManager::new());
    board_manager.register_message::<LocationMessage>("locations")?;

    let mut post = AgentTaskBuilder::new(
        "post",
        "Circle",
        Arc::clone(&memory),
        Arc::clone(&board_manager),
        Arc::new(|ctx: &FlameContext| {
            let id: i64 = ctx.get_mem("id")?;
            ctx.post_message("locations", LocationMessage { id })?;
            Ok(AgentStatus::Alive)
        }),
    );
    post.allow_access("id", false)?;
    post.allow_message_post("locations")?;

    let mut read = AgentTaskBuilder::new(
        "read",
        "Circle",
        Arc::clone(&memory),
        Arc::clone(&board_manager),
        Arc::new(|ctx: &FlameContext| {
            let sum: i64 = ctx.message_iterator::<LocationMessage>("locations")?.map(|m| m.id).sum();
            ctx.set_mem("checksum", sum)?;
            Ok(AgentStatus::Alive)
        }),
    );
    read.allow_access("checksum", true)?;
    read.allow_message_read("locations")?;

    let mut tasks = TaskManager::new();
    tasks.add_agent_task(post.build())?;
    let sync_id = tasks.add_board_task("sync", "locations", BoardOp::Sync)?;
    tasks.add_agent_task(read.build())?;
    let clear_id = tasks.add_board_task("clear", "locations", BoardOp::Clear)?;
    let _ = (sync_id, clear_id);

    tasks.add_dependency("sync", "post")?;
    tasks.add_dependency("read", "sync")?;
    tasks.add_dependency("clear", "read")?;

    let task_manager = Arc::new(tasks);
    let mut scheduler = Scheduler::new(Arc::clone(&task_manager), Arc::clone(&board_manager));
    let agent_queue = scheduler.create_queue(QueueKind::Fifo, 2);
    let board_queue = scheduler.create_queue(QueueKind::Fifo, 1);
    scheduler.assign_type(agent_queue, TaskKind::AgentFunction)?;
    scheduler.assign_type(board_queue, TaskKind::MessageSync)?;
    scheduler.assign_type(board_queue, TaskKind::MessageClear)?;

    scheduler.run_iteration()?;
    scheduler.shutdown();

    let checksum = memory.get_vector::<i64>("checksum")?.get(0);
    let count_after_clear = board_manager.get_count("locations")?;
    println!("checksum[0]={checksum} (want 4950), board count after clear={count_after_clear} (want 0)");

    Ok(())
}

fn main() -> Result<()> {
    flame_core::init_tracing();
    println!("=== circles — FLAME2 demo ===");
    run_arithmetic_scenario()?;
    run_message_scenario()?;
    Ok(())
}
