pub mod api_key;
pub mod clinic;
pub mod clinic_user;
pub mod context;
pub mod doctor;
pub mod exam;
pub mod medical_record;
pub mod patient;
pub mod profile;
pub mod refresh_session;
pub mod registration;
pub mod user;
pub mod user_identity;
pub mod verification_token;

pub use api_key::{ApiKeyResponse, CreateApiKeyRequest, CreateApiKeyResponse, UserApiKey};
pub use clinic::{Clinic, ClinicResponse, ClinicState, CreateClinicRequest, UpdateClinicRequest};
pub use clinic_user::{
    AcceptInvitationRequest, ClinicUser, CreateInvitationRequest, InvitationResponse,
    InvitationState, MemberRole, INVITATION_EXPIRY_DAYS,
};
pub use context::{ClinicContext, MembershipDetail, SessionContext};
pub use doctor::{CreateDoctorRequest, Doctor, DoctorResponse, UpdateDoctorRequest};
pub use exam::{
    CreateExamRequest, Exam, ExamResponse, ExamStatus, ListExamsQuery, UpdateExamRequest,
};
pub use medical_record::{
    CreateMedicalRecordRequest, ListMedicalRecordsQuery, MedicalRecord, MedicalRecordResponse,
    UpdateMedicalRecordRequest,
};
pub use patient::{
    CreatePatientRequest, ListPatientsQuery, Patient, PatientResponse, UpdatePatientRequest,
};
pub use profile::{AppRole, Profile, ProfileResponse};
pub use refresh_session::RefreshSession;
pub use registration::{RegistrationResponse, SubmitRegistrationRequest, UserRegistration};
pub use user::{
    AuthResponse, ChangePasswordRequest, LoginRequest, LogoutRequest, PasswordResetConfirm,
    PasswordResetRequest, RefreshRequest, RegisterRequest, ResendVerificationRequest,
    TokenResponse, UpdateMeRequest, User, UserResponse, UserState,
};
pub use user_identity::{IdentProvider, UserIdentity};
pub use verification_token::{TokenType, VerificationToken};
