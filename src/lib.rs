pub mod app;

use app::commands::{
    check_hdc, clear_app_data, connect_target, execute_launch, export_diagnostics_bundle,
    export_run_log, force_stop_app, get_app_info, get_config, install_package, launch_app,
    list_apps, list_targets, preview_launch_command, reset_config, save_app_config, stop_exec,
    uninstall_app,
};
use app::logging::init_logging;
use app::state::AppState;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    init_logging();
    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_clipboard_manager::init())
        .plugin(tauri_plugin_opener::init())
        .manage(AppState::new())
        .invoke_handler(tauri::generate_handler![
            get_config,
            save_app_config,
            reset_config,
            check_hdc,
            export_diagnostics_bundle,
            list_targets,
            connect_target,
            preview_launch_command,
            execute_launch,
            stop_exec,
            export_run_log,
            list_apps,
            get_app_info,
            install_package,
            uninstall_app,
            launch_app,
            force_stop_app,
            clear_app_data
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
