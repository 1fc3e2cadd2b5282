use crate::api::attendance::{
    AttendanceOut, AttendanceStatusRow, AttendanceSummary, CheckInRequest, CheckOutRequest,
    LocationDetails,
};
use crate::api::dashboard::{ActivityItem, DepartmentPerformance};
use crate::api::department::{CreateDepartment, ManagerOption};
use crate::api::hiring::{CreateCandidate, CreateVacancy, PostSocial};
use crate::api::leave::{
    ApproveBody, CreateLeave, LeaveBalanceItem, LeaveListResponse, LeaveWithUser, RejectBody,
    UpdateLeave,
};
use crate::api::office_timing::{OfficeTimingOut, OfficeTimingUpsert};
use crate::api::settings::UpdateSettings;
use crate::api::shift::{
    AssignShift, AssignmentWithUser, BulkAssignShift, CreateShift, DepartmentSchedule,
    DepartmentScheduleRange, ShiftScheduleEntry, UpdateAssignment, UpdateShift, UserBrief,
};
use crate::api::task::{CreateTask, PassTask, UpdateTask, UpdateTaskStatus};
use crate::api::user::{CreateUser, UpdateRole, UpdateStatus, UserListResponse};
use crate::model::department::Department;
use crate::model::hiring::{Candidate, Vacancy};
use crate::model::leave::{Leave, LeaveStatus};
use crate::model::notification::{LeaveNotification, ShiftNotification, TaskNotification};
use crate::model::settings::UserSettings;
use crate::model::shift::{Shift, ShiftAssignment};
use crate::model::task::{Task, TaskHistory, TaskStatus};
use crate::model::user::User;
use crate::models::LoginReqDto;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "EMS API",
        version = "1.0.0",
        description = r#"
## Employee Management System

Backend for employee records, attendance tracking, leave workflows, task
assignment, shift scheduling, hiring pipeline and role dashboards.

### Key Features
- **Attendance** — selfie/location check-in and check-out with grace-aware
  late/early classification against configurable office hours
- **Leave** — application, department-scoped approval queues, balances and
  notifications
- **Tasks** — assignment, passing with history, notifications
- **Shifts** — per-date assignment and department schedules
- **Hiring** — vacancies and candidate pipeline
- **Dashboards** — per-role aggregate views

### Security
JWT Bearer authentication with rotating refresh tokens. Sensitive operations
require **Admin**, **HR** or **Manager** roles.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::user::create_user,
        crate::api::user::list_users,
        crate::api::user::get_me,
        crate::api::user::get_user,
        crate::api::user::update_user,
        crate::api::user::update_user_role,
        crate::api::user::update_user_status,
        crate::api::user::delete_user,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::my_attendance,
        crate::api::attendance::today_attendance,
        crate::api::attendance::all_attendance,
        crate::api::attendance::attendance_summary,

        crate::api::office_timing::list_office_timings,
        crate::api::office_timing::effective_office_timing,
        crate::api::office_timing::upsert_office_timing,
        crate::api::office_timing::deactivate_office_timing,

        crate::api::leave::create_leave,
        crate::api::leave::approve_leave,
        crate::api::leave::reject_leave,
        crate::api::leave::my_leaves,
        crate::api::leave::leave_balance,
        crate::api::leave::update_leave,
        crate::api::leave::delete_leave,
        crate::api::leave::all_leaves,
        crate::api::leave::pending_approvals,
        crate::api::leave::leave_notifications,
        crate::api::leave::mark_leave_notification_read,

        crate::api::task::create_task,
        crate::api::task::list_tasks,
        crate::api::task::update_task,
        crate::api::task::update_task_status,
        crate::api::task::pass_task,
        crate::api::task::delete_task,
        crate::api::task::task_history,
        crate::api::task::task_notifications,
        crate::api::task::mark_task_notification_read,

        crate::api::shift::create_shift,
        crate::api::shift::list_shifts,
        crate::api::shift::get_shift,
        crate::api::shift::update_shift,
        crate::api::shift::delete_shift,
        crate::api::shift::assign_shift,
        crate::api::shift::bulk_assign_shift,
        crate::api::shift::update_assignment,
        crate::api::shift::delete_assignment,
        crate::api::shift::my_schedule,
        crate::api::shift::department_schedule,
        crate::api::shift::department_schedule_range,
        crate::api::shift::shift_notifications,
        crate::api::shift::mark_shift_notification_read,

        crate::api::department::list_departments,
        crate::api::department::list_managers,
        crate::api::department::create_department,
        crate::api::department::update_department,
        crate::api::department::delete_department,

        crate::api::hiring::create_vacancy,
        crate::api::hiring::list_vacancies,
        crate::api::hiring::get_vacancy,
        crate::api::hiring::update_vacancy,
        crate::api::hiring::delete_vacancy,
        crate::api::hiring::post_vacancy_social,
        crate::api::hiring::create_candidate,
        crate::api::hiring::list_candidates,
        crate::api::hiring::get_candidate,
        crate::api::hiring::update_candidate,
        crate::api::hiring::delete_candidate,

        crate::api::settings::get_my_settings,
        crate::api::settings::update_my_settings,
        crate::api::settings::get_user_settings,
        crate::api::settings::update_user_settings,

        crate::api::dashboard::admin_dashboard,
        crate::api::dashboard::hr_dashboard,
        crate::api::dashboard::manager_dashboard,
        crate::api::dashboard::team_lead_dashboard,
        crate::api::dashboard::employee_dashboard
    ),
    components(
        schemas(
            LoginReqDto,
            User,
            UserListResponse,
            CreateUser,
            UpdateRole,
            UpdateStatus,
            CheckInRequest,
            CheckOutRequest,
            LocationDetails,
            AttendanceOut,
            AttendanceStatusRow,
            AttendanceSummary,
            OfficeTimingOut,
            OfficeTimingUpsert,
            Leave,
            LeaveStatus,
            CreateLeave,
            UpdateLeave,
            ApproveBody,
            RejectBody,
            LeaveWithUser,
            LeaveListResponse,
            LeaveBalanceItem,
            LeaveNotification,
            Task,
            TaskStatus,
            TaskHistory,
            CreateTask,
            UpdateTask,
            UpdateTaskStatus,
            PassTask,
            TaskNotification,
            Shift,
            ShiftAssignment,
            CreateShift,
            UpdateShift,
            AssignShift,
            BulkAssignShift,
            UpdateAssignment,
            UserBrief,
            AssignmentWithUser,
            ShiftScheduleEntry,
            DepartmentSchedule,
            DepartmentScheduleRange,
            ShiftNotification,
            Department,
            CreateDepartment,
            ManagerOption,
            Vacancy,
            Candidate,
            CreateVacancy,
            PostSocial,
            CreateCandidate,
            UserSettings,
            UpdateSettings,
            ActivityItem,
            DepartmentPerformance
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and token lifecycle"),
        (name = "Users", description = "Employee record management"),
        (name = "Attendance", description = "Check-in/check-out tracking"),
        (name = "OfficeHours", description = "Office timing configuration"),
        (name = "Leave", description = "Leave requests and approvals"),
        (name = "Tasks", description = "Task assignment and history"),
        (name = "Shifts", description = "Shift scheduling"),
        (name = "Departments", description = "Department management"),
        (name = "Hiring", description = "Vacancies and candidates"),
        (name = "Settings", description = "Per-user preferences"),
        (name = "Dashboard", description = "Role dashboards"),
    )
)]
pub struct ApiDoc;
