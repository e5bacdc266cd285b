pub type Float = f32;
