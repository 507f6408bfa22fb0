/// UI components and pages

pub mod components;
pub mod dashboard;
pub mod popup;
