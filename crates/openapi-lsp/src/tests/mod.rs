pub mod mock_editor;
pub mod test_utils;

mod configuration_test;
mod disk_change_test;
