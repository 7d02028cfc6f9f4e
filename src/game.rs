pub mod autoplay;
pub mod chart;
pub mod feedback;
pub mod gameplay;
pub mod guitar;
pub mod hold;
pub mod judgment;
pub mod matcher;
pub mod neck;
pub mod note;
pub mod timing;
