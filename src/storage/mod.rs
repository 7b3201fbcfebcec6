pub mod avatars;
