use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::todo::reconciler::Board;

pub type DBConnection = Arc<Mutex<Connection>>;
pub type BoardState = Arc<Mutex<Board>>;
