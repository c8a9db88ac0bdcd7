//! # tes — Task Execution and Scheduling
//!
//! A simulated single-register machine that runs small assembly-like
//! programs under a preemptive Round-Robin scheduler.
//!
//! ## Overview
//!
//! Programs submitted together are split into batches of two. Each batch
//! gets its own execution machine on a worker thread, and inside that
//! machine the scheduler interleaves the two tasks one instruction at a
//! time until both have halted or faulted. When a batch finishes, its
//! per-task occupancy and the batch's mean turnaround and wait times are
//! reported.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │              tes binary (main.rs) · prompt             │
//! ├────────────────────────────┬───────────────────────────┤
//! │  Loader (loader.rs)        │  Dispatcher (dispatch.rs) │
//! │  ─ parse_command()         │  ─ partition()            │
//! │  ─ load_batch()            │  ─ dispatch()             │
//! ├──────────────┬─────────────┴──────┬────────────────────┤
//! │  Scheduler   │  Interpreter       │  Metrics           │
//! │  scheduler.rs│  interpreter.rs    │  metrics.rs        │
//! │  ─ run()     │  ─ step()          │  ─ collect()       │
//! │  ─ tick()    │  ─ resolve()       │  ─ Display         │
//! ├──────────────┴────────────────────┴────────────────────┤
//! │        Execution Machine (machine.rs)                  │
//! │    2 task slots · scratch context · context switch     │
//! ├────────────────────────────────────────────────────────┤
//! │   Task Model (task.rs) · Programs (program.rs)         │
//! │    TaskContext · VariableTable · Instruction           │
//! ├────────────────────────────────────────────────────────┤
//! │         Console (console.rs): READ · WRITE · faults    │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Instruction Set
//!
//! | Opcode | Effect |
//! |--------|--------|
//! | `LOAD a`  | `R := a` |
//! | `STORE x` | `x := R` |
//! | `ADD a` / `SUB a` / `MUL a` / `DIV a` | `R := R op a` |
//! | `READ x`  | read an integer from the console into `x` |
//! | `WRITE a` | print `a`, or `R` when no argument is given |
//! | `HALT`    | terminate the task |
//!
//! Every instruction costs one time unit of CPU. A READ additionally costs
//! three units of IO time.
//!
//! ## Time Model
//!
//! Time is a logical counter advanced once per executed instruction. A task
//! that has run for a full quantum is preempted only when its sibling is
//! ready to take over; a lone task keeps the CPU until it terminates.

pub mod config;
pub mod console;
pub mod dispatch;
pub mod error;
pub mod fixed;
pub mod interpreter;
pub mod loader;
pub mod machine;
pub mod metrics;
pub mod program;
pub mod scheduler;
pub mod task;
