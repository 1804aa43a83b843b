// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod nodes;
pub mod records;
pub mod reward;
