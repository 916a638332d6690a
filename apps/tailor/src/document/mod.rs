// Document layer: the styled paragraph/run model, the placeholder filler and
// the .docx codec. Nothing here talks to the network or the clock.

pub mod docx;
pub mod filler;
pub mod model;
