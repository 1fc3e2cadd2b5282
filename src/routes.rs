use crate::{
    api::{
        attendance, dashboard, department, hiring, leave, office_timing, settings, shift, task,
        user,
    },
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/users")
                    .service(
                        web::resource("")
                            .route(web::post().to(user::create_user))
                            .route(web::get().to(user::list_users)),
                    )
                    .service(web::resource("/me").route(web::get().to(user::get_me)))
                    .service(
                        web::resource("/{user_id}/role")
                            .route(web::put().to(user::update_user_role)),
                    )
                    .service(
                        web::resource("/{user_id}/status")
                            .route(web::put().to(user::update_user_status)),
                    )
                    .service(
                        web::resource("/{user_id}")
                            .route(web::get().to(user::get_user))
                            .route(web::put().to(user::update_user))
                            .route(web::delete().to(user::delete_user)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    .service(
                        web::resource("/check-in").route(web::post().to(attendance::check_in)),
                    )
                    .service(
                        web::resource("/check-out").route(web::post().to(attendance::check_out)),
                    )
                    .service(web::resource("/my").route(web::get().to(attendance::my_attendance)))
                    .service(
                        web::resource("/today").route(web::get().to(attendance::today_attendance)),
                    )
                    .service(
                        web::resource("/summary")
                            .route(web::get().to(attendance::attendance_summary)),
                    )
                    .service(web::resource("/all").route(web::get().to(attendance::all_attendance)))
                    .service(
                        web::resource("/office-hours")
                            .route(web::get().to(office_timing::list_office_timings))
                            .route(web::put().to(office_timing::upsert_office_timing)),
                    )
                    .service(
                        web::resource("/office-hours/effective")
                            .route(web::get().to(office_timing::effective_office_timing)),
                    )
                    .service(
                        web::resource("/office-hours/{timing_id}")
                            .route(web::delete().to(office_timing::deactivate_office_timing)),
                    ),
            )
            .service(
                web::scope("/leave")
                    .service(web::resource("").route(web::post().to(leave::create_leave)))
                    .service(web::resource("/my").route(web::get().to(leave::my_leaves)))
                    .service(web::resource("/balance").route(web::get().to(leave::leave_balance)))
                    .service(web::resource("/all").route(web::get().to(leave::all_leaves)))
                    .service(
                        web::resource("/pending").route(web::get().to(leave::pending_approvals)),
                    )
                    .service(
                        web::resource("/notifications")
                            .route(web::get().to(leave::leave_notifications)),
                    )
                    .service(
                        web::resource("/notifications/{notification_id}/read")
                            .route(web::put().to(leave::mark_leave_notification_read)),
                    )
                    .service(
                        web::resource("/{leave_id}/approve")
                            .route(web::post().to(leave::approve_leave)),
                    )
                    .service(
                        web::resource("/{leave_id}/reject")
                            .route(web::post().to(leave::reject_leave)),
                    )
                    .service(
                        web::resource("/{leave_id}")
                            .route(web::put().to(leave::update_leave))
                            .route(web::delete().to(leave::delete_leave)),
                    ),
            )
            .service(
                web::scope("/tasks")
                    .service(
                        web::resource("")
                            .route(web::post().to(task::create_task))
                            .route(web::get().to(task::list_tasks)),
                    )
                    .service(
                        web::resource("/notifications")
                            .route(web::get().to(task::task_notifications)),
                    )
                    .service(
                        web::resource("/notifications/{notification_id}/read")
                            .route(web::put().to(task::mark_task_notification_read)),
                    )
                    .service(
                        web::resource("/{task_id}/status")
                            .route(web::put().to(task::update_task_status)),
                    )
                    .service(
                        web::resource("/{task_id}/pass").route(web::post().to(task::pass_task)),
                    )
                    .service(
                        web::resource("/{task_id}/history")
                            .route(web::get().to(task::task_history)),
                    )
                    .service(
                        web::resource("/{task_id}")
                            .route(web::put().to(task::update_task))
                            .route(web::delete().to(task::delete_task)),
                    ),
            )
            .service(
                web::scope("/shifts")
                    .service(
                        web::resource("")
                            .route(web::post().to(shift::create_shift))
                            .route(web::get().to(shift::list_shifts)),
                    )
                    .service(
                        web::resource("/notifications")
                            .route(web::get().to(shift::shift_notifications)),
                    )
                    .service(
                        web::resource("/notifications/{notification_id}/read")
                            .route(web::put().to(shift::mark_shift_notification_read)),
                    )
                    .service(
                        web::resource("/assignment/bulk")
                            .route(web::post().to(shift::bulk_assign_shift)),
                    )
                    .service(
                        web::resource("/assignment/{assignment_id}")
                            .route(web::put().to(shift::update_assignment))
                            .route(web::delete().to(shift::delete_assignment)),
                    )
                    .service(
                        web::resource("/assignment").route(web::post().to(shift::assign_shift)),
                    )
                    .service(
                        web::resource("/schedule/my").route(web::get().to(shift::my_schedule)),
                    )
                    .service(
                        web::resource("/schedule/department/range")
                            .route(web::get().to(shift::department_schedule_range)),
                    )
                    .service(
                        web::resource("/schedule/department")
                            .route(web::get().to(shift::department_schedule)),
                    )
                    .service(
                        web::resource("/{shift_id}")
                            .route(web::get().to(shift::get_shift))
                            .route(web::put().to(shift::update_shift))
                            .route(web::delete().to(shift::delete_shift)),
                    ),
            )
            .service(
                web::scope("/departments")
                    .service(
                        web::resource("")
                            .route(web::get().to(department::list_departments))
                            .route(web::post().to(department::create_department)),
                    )
                    .service(
                        web::resource("/managers")
                            .route(web::get().to(department::list_managers)),
                    )
                    .service(
                        web::resource("/{dept_id}")
                            .route(web::put().to(department::update_department))
                            .route(web::delete().to(department::delete_department)),
                    ),
            )
            .service(
                web::scope("/hiring")
                    .service(
                        web::resource("/vacancies")
                            .route(web::post().to(hiring::create_vacancy))
                            .route(web::get().to(hiring::list_vacancies)),
                    )
                    .service(
                        web::resource("/vacancies/{vacancy_id}/post-social")
                            .route(web::post().to(hiring::post_vacancy_social)),
                    )
                    .service(
                        web::resource("/vacancies/{vacancy_id}")
                            .route(web::get().to(hiring::get_vacancy))
                            .route(web::put().to(hiring::update_vacancy))
                            .route(web::delete().to(hiring::delete_vacancy)),
                    )
                    .service(
                        web::resource("/candidates")
                            .route(web::post().to(hiring::create_candidate))
                            .route(web::get().to(hiring::list_candidates)),
                    )
                    .service(
                        web::resource("/candidates/{candidate_id}")
                            .route(web::get().to(hiring::get_candidate))
                            .route(web::put().to(hiring::update_candidate))
                            .route(web::delete().to(hiring::delete_candidate)),
                    ),
            )
            .service(
                web::scope("/settings")
                    .service(
                        web::resource("/me")
                            .route(web::get().to(settings::get_my_settings))
                            .route(web::put().to(settings::update_my_settings)),
                    )
                    .service(
                        web::resource("/{user_id}")
                            .route(web::get().to(settings::get_user_settings))
                            .route(web::put().to(settings::update_user_settings)),
                    ),
            )
            .service(
                web::scope("/dashboard")
                    .service(
                        web::resource("/admin").route(web::get().to(dashboard::admin_dashboard)),
                    )
                    .service(web::resource("/hr").route(web::get().to(dashboard::hr_dashboard)))
                    .service(
                        web::resource("/manager")
                            .route(web::get().to(dashboard::manager_dashboard)),
                    )
                    .service(
                        web::resource("/team-lead")
                            .route(web::get().to(dashboard::team_lead_dashboard)),
                    )
                    .service(
                        web::resource("/employee")
                            .route(web::get().to(dashboard::employee_dashboard)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)
//
// API REQUEST
//  └─ Authorization: Bearer access_token
//
// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns new access_token
