//! Adapters — concrete implementations of the port and channel traits.
//!
//! | Adapter       | Implements  | Connects to                     |
//! |---------------|-------------|---------------------------------|
//! | `mem_disk`    | BlockDevice | RAM (host runs, tests)          |
//! | `file_disk`   | BlockDevice | Raw SD-card image file          |
//! | `remote_disk` | BlockDevice | BlockClient → real-time core    |
//! | `loopback`    | Channel     | In-process queue pair           |
//! | `console_log` | log::Log    | stderr                          |

pub mod console_log;
pub mod file_disk;
pub mod loopback;
pub mod mem_disk;
pub mod remote_disk;
