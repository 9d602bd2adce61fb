use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, GenericArgument, Lit, PathArguments, Type};

/// Derives `adf_agent_sdk::FunctionTool` for an argument struct.
///
/// ```ignore
/// #[derive(Debug, Default, Deserialize, FunctionTool)]
/// #[tool(name = "adf_pipeline_runs", description = "...")]
/// struct PipelineRunsArgs {
///     #[param(description = "Pipeline name")]
///     pipelinename: Option<String>,
/// }
/// ```
///
/// Fields that are not `Option<T>` are listed as required in the schema.
#[proc_macro_derive(FunctionTool, attributes(tool, param))]
pub fn derive_function_tool(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let tool_meta = extract_tool_meta(&input.attrs);

    let mut properties: Vec<proc_macro2::TokenStream> = Vec::new();
    let mut required: Vec<String> = Vec::new();

    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => {
                for f in &fields.named {
                    let Some(ident) = f.ident.as_ref() else {
                        continue;
                    };
                    let name = ident.to_string();
                    let json_type = infer_json_type(&f.ty);
                    let description = extract_param_description(&f.attrs);

                    if !is_option_type(&f.ty) {
                        required.push(name.clone());
                    }

                    properties.push(quote! {
                        properties.insert(
                            #name.to_string(),
                            adf_agent_sdk::serde_json::json!({
                                "type": #json_type,
                                "description": #description,
                            }),
                        );
                    });
                }
            }
            Fields::Unit => {}
            _ => panic!("FunctionTool only supports named fields"),
        },
        _ => panic!("FunctionTool only supports structs"),
    };

    let struct_name = &input.ident;
    let tool_name = &tool_meta.name;
    let tool_desc = &tool_meta.description;

    let expanded = quote! {
        impl adf_agent_sdk::FunctionTool for #struct_name {
            fn tool_name() -> &'static str {
                #tool_name
            }

            fn definition() -> adf_agent_sdk::FunctionDefinition {
                let mut properties = adf_agent_sdk::serde_json::Map::new();
                #(#properties)*
                let required: Vec<&str> = vec![#(#required),*];

                adf_agent_sdk::FunctionDefinition {
                    name: #tool_name.to_string(),
                    description: #tool_desc.to_string(),
                    parameters: adf_agent_sdk::serde_json::json!({
                        "type": "object",
                        "properties": properties,
                        "required": required,
                    }),
                }
            }
        }
    };

    TokenStream::from(expanded)
}

struct ToolMeta {
    name: String,
    description: String,
}

fn extract_tool_meta(attrs: &[Attribute]) -> ToolMeta {
    for attr in attrs {
        if attr.path().is_ident("tool") {
            let mut name = String::new();
            let mut description = String::new();

            let _ = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value = meta.value()?;
                    let lit: Lit = value.parse()?;
                    if let Lit::Str(s) = lit {
                        name = s.value();
                    }
                } else if meta.path.is_ident("description") {
                    let value = meta.value()?;
                    let lit: Lit = value.parse()?;
                    if let Lit::Str(s) = lit {
                        description = s.value();
                    }
                }
                Ok(())
            });

            if name.is_empty() {
                panic!("#[tool(...)] requires a name");
            }

            return ToolMeta { name, description };
        }
    }

    panic!("Missing #[tool(...)] attribute");
}

fn extract_param_description(attrs: &[Attribute]) -> String {
    let mut description = String::new();

    for attr in attrs {
        if attr.path().is_ident("param") {
            let _ = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("description") {
                    let value = meta.value()?;
                    let lit: Lit = value.parse()?;
                    if let Lit::Str(s) = lit {
                        description = s.value();
                    }
                }
                Ok(())
            });
        }
    }

    description
}

fn infer_json_type(ty: &Type) -> &'static str {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            if segment.ident == "Option" {
                if let PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(GenericArgument::Type(inner_ty)) = args.args.first() {
                        return infer_json_type_inner(inner_ty);
                    }
                }
            } else {
                return infer_json_type_inner(ty);
            }
        }
    }

    "string"
}

fn infer_json_type_inner(ty: &Type) -> &'static str {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return match segment.ident.to_string().as_str() {
                "String" | "PathBuf" => "string",
                "usize" | "u8" | "u16" | "u32" | "u64" | "isize" | "i8" | "i16" | "i32" | "i64" => {
                    "integer"
                }
                "f32" | "f64" => "number",
                "bool" => "boolean",
                "Vec" => "array",
                _ => "string",
            };
        }
    }
    "string"
}

fn is_option_type(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "Option";
        }
    }
    false
}
