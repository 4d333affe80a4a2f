// Prompt template for test generation
use std::path::Path;

use crate::detector::TestFramework;
use crate::pipeline::collector::{Role, SourceFile};

/// Markdown fence tag for a source file, from its extension.
pub fn fence_language(path: &Path) -> &str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .unwrap_or("javascript")
}

fn role_instructions(role: Role, framework: TestFramework) -> String {
    match role {
        Role::Route => format!(
            r#"For ROUTES ({framework}):
- Test every HTTP method the router exposes (GET, POST, PUT, PATCH, DELETE)
- Test request parsing and response bodies
- Test middleware functionality
- Test error responses and status codes
- Mock database calls and external services with {framework} mocks"#
        ),
        Role::Controller => format!(
            r#"For CONTROLLERS ({framework}):
- Test all public methods
- Test input validation
- Test business logic
- Test error handling
- Mock dependencies and services with {framework} mocks"#
        ),
    }
}

/// Render the prompt asking the model for a test file covering `file`.
///
/// Pure: identical inputs always give byte-identical output.
pub fn test_generation_prompt(
    file: &SourceFile,
    framework: TestFramework,
    project_structure: &str,
    custom_instructions: Option<&str>,
) -> String {
    let mut prompt = format!(
        r#"You are an expert test generator. Generate comprehensive {framework} tests for the following {role} file.

PROJECT STRUCTURE:
{project_structure}

FILE TYPE: {role}
FILE PATH: {path}
FILE CONTENT:
```{lang}
{content}
```

REQUIREMENTS:
1. Generate complete, runnable {framework} tests
2. Include imports and setup code
3. Test all exported functions/methods/routes
4. Include both positive and negative test cases
5. Mock external dependencies appropriately
6. Follow best practices for {framework}
7. Include proper error handling tests
8. Test edge cases and boundary conditions

{role_block}

RESPONSE FORMAT:
Return a JSON object with exactly these three fields:
{{
  "generatedTest": "complete test code here",
  "testFileName": "test file name ending in .test.ts or .test.js",
  "dependencies": ["additional npm packages needed for testing"]
}}
"#,
        framework = framework,
        role = file.role,
        project_structure = project_structure,
        path = file.relative_path.display(),
        lang = fence_language(&file.path),
        content = file.content,
        role_block = role_instructions(file.role, framework),
    );

    if let Some(custom) = custom_instructions.filter(|c| !c.trim().is_empty()) {
        prompt.push_str("\nADDITIONAL INSTRUCTIONS:\n");
        prompt.push_str(custom.trim());
        prompt.push('\n');
    }

    prompt.push_str("\nGenerate the tests now:");
    prompt
}
