// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod columns;
pub mod controller;
pub mod forms;
pub mod ids;
pub mod model;
pub mod notice;
pub mod state;

pub use columns::*;
pub use controller::*;
pub use forms::*;
pub use ids::*;
pub use model::*;
pub use notice::*;
pub use state::*;
