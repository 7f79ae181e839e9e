pub mod ascii_art;
pub mod detective;
