//! Prompt templates for application email generation.

pub const SYSTEM_PROMPT: &str = "\
You are an expert career coach and professional email writer.
Your task is to write a job application email on behalf of the candidate.

Rules:
- Write a professional, concise, and personalized application email.
- The email should be 150-250 words (body only, excluding subject).
- Open with genuine interest in the specific role and company.
- Highlight 2-3 most relevant experiences from the resume that match the job.
- Show enthusiasm without being over-the-top.
- Close with a clear call to action (e.g., available for an interview).
- Do NOT use generic filler phrases like \"I am writing to express my interest\".
- Do NOT include the subject line in the body.
- Use a warm but professional tone.
- Sign off with the candidate's name.
";

/// User prompt. Placeholders: `{job_title}`, `{employer}`, `{location}`,
/// `{description}`, `{resume_text}`, `{candidate_name}`, `{candidate_email}`,
/// `{candidate_phone}`.
pub const EMAIL_PROMPT_TEMPLATE: &str = "\
Write a job application email for the following position.

--- JOB DETAILS ---
Title: {job_title}
Company: {employer}
Location: {location}
Description:
{description}

--- CANDIDATE RESUME ---
{resume_text}

--- CANDIDATE INFO ---
Name: {candidate_name}
Email: {candidate_email}
Phone: {candidate_phone}

Please respond in EXACTLY this format:

SUBJECT: <email subject line>

BODY:
<email body>
";

pub const FALLBACK_SUBJECT: &str = "Application for {job_title} at {employer}";

/// Used when the LLM call fails or its response cannot be parsed. Kept
/// generic: everything personal comes from the candidate profile.
pub const FALLBACK_BODY: &str = "\
Dear Hiring Manager,

I am excited to apply for the {job_title} position at {employer}. I believe my \
background and experience are a strong match for this role, and I would be glad \
to bring that experience to your team.

My resume is attached with the details of my work history and the projects I \
have delivered. I would welcome the opportunity to discuss how my skills align \
with your needs.

Best regards,
{candidate_name}
{candidate_email}
{candidate_phone}
";
